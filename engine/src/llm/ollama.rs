//! Ollama completion backend
//!
//! Talks to a local Ollama server through its `/api/generate` endpoint in
//! raw mode, so the prompt is sent exactly as rendered by the service.
//! Ollama runs models locally on the user's machine, typically at
//! http://localhost:11434.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use super::{CompletionBackend, GenerationParams, LLMError, Result};

/// Ollama backend configuration and client
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "llama3.2")
    model: String,

    /// HTTP client for API requests
    client: Client,

    /// Runtime used to drive the async client from the blocking pool
    runtime: Handle,
}

impl OllamaBackend {
    /// Create a new Ollama backend.
    ///
    /// Must be called from within a Tokio runtime; the backend keeps a handle
    /// to it for issuing requests.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| LLMError::Unknown(format!("No async runtime available: {}", e)))?;

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LLMError::Unknown(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            runtime,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        tracing::debug!(
            "Ollama request: model={}, prompt_chars={}, max_tokens={}",
            self.model,
            prompt.len(),
            params.max_tokens
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            raw: true,
            options: GenerateOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderUnavailable(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(body.response.trim().to_string())
    }
}

impl CompletionBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn complete(&mut self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.runtime.block_on(self.request(prompt, params))
    }
}

/// Ollama `/api/generate` request body
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    raw: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
}

/// Ollama `/api/generate` response body (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
