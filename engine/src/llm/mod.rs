//! Completion backend abstraction
//!
//! A completion backend turns a prompt into generated text. Backends are
//! exclusive, blocking resources (one loaded model, one request at a time);
//! the [`CompletionService`] owns the backend behind an async mutex and runs
//! each generation on the blocking thread pool while holding it.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod service;

pub use ollama::OllamaBackend;
pub use service::CompletionService;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during generation
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Role of a conversation participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Lenient conversion from stored metadata; anything but "user" is the assistant
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("user") {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Sampling parameters for one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// A text-completion backend.
///
/// `complete` blocks the calling thread until generation finishes. It is only
/// ever called from the blocking pool, never from an async task.
pub trait CompletionBackend: Send {
    /// Short backend name for logs (e.g. "ollama")
    fn name(&self) -> &str;

    fn complete(&mut self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Render the text actually sent to the backend.
///
/// Without history the prompt is passed through untouched. Otherwise each
/// turn becomes a `ROLE: content` line, followed by a blank line, the prompt
/// as the user turn and an open `ASSISTANT:` turn.
pub fn render_transcript(prompt: &str, history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return prompt.to_string();
    }

    let mut out = String::new();
    for turn in history {
        out.push_str(&turn.role.as_str().to_uppercase());
        out.push_str(": ");
        out.push_str(&turn.content);
        out.push('\n');
    }
    out.push_str("\nUSER: ");
    out.push_str(prompt);
    out.push_str("\nASSISTANT:");
    out
}
