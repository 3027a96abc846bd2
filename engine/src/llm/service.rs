//! Serialized access to a completion backend

use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{render_transcript, CompletionBackend, ConversationTurn, GenerationParams};

/// Owns one completion backend and guarantees at most one generation in flight.
///
/// Clones share the same backend slot.
#[derive(Clone)]
pub struct CompletionService {
    backend: Arc<Mutex<Box<dyn CompletionBackend>>>,
    name: String,
}

impl CompletionService {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        let name = backend.name().to_string();
        Self {
            backend: Arc::new(Mutex::new(backend)),
            name,
        }
    }

    /// Name of the wrapped backend
    pub fn backend_name(&self) -> &str {
        &self.name
    }

    /// True while a generation holds the backend
    pub fn is_busy(&self) -> bool {
        self.backend.try_lock().is_err()
    }

    /// Generate a completion for `prompt` given prior `history`.
    ///
    /// Waits for the backend slot, then runs the backend on the blocking
    /// pool. The slot stays locked until the backend call returns, even if
    /// the caller stops waiting.
    pub async fn generate(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
        params: &GenerationParams,
    ) -> Result<String, EngineError> {
        let full_prompt = render_transcript(prompt, history);
        let params = params.clone();

        let mut guard = Arc::clone(&self.backend).lock_owned().await;
        debug!(
            "Acquired {} backend, prompt_chars={}",
            self.name,
            full_prompt.len()
        );

        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let backend = &mut *guard;
            backend.complete(&full_prompt, &params)
        })
        .await;

        match result {
            Ok(Ok(text)) => {
                info!(
                    "Generation finished in {:.1}s ({} chars)",
                    start.elapsed().as_secs_f64(),
                    text.len()
                );
                Ok(text)
            }
            Ok(Err(e)) => Err(EngineError::GenerationFailure(e.to_string())),
            Err(e) => Err(EngineError::GenerationFailure(format!(
                "Generation task failed: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Sleeps while counting how many calls overlap
    struct SlowBackend {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl CompletionBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn complete(&mut self, prompt: &str, _params: &GenerationParams) -> Result<String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("echo: {}", prompt))
        }
    }

    struct BrokenBackend;

    impl CompletionBackend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        fn complete(&mut self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            Err(LLMError::ProviderUnavailable("model not loaded".to_string()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_generations_never_overlap() {
        let peak = Arc::new(AtomicUsize::new(0));
        let service = CompletionService::new(Box::new(SlowBackend {
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        }));

        let mut handles = Vec::new();
        for i in 0..4 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .generate(&format!("q{}", i), &[], &GenerationParams::default())
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().starts_with("echo: q"));
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn test_history_is_rendered_into_prompt() {
        let service = CompletionService::new(Box::new(SlowBackend {
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }));

        let history = vec![ConversationTurn::user("hi")];
        let text = service
            .generate("next", &history, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(text, "echo: USER: hi\n\nUSER: next\nASSISTANT:");
    }

    #[tokio::test]
    async fn test_backend_error_is_generation_failure() {
        let service = CompletionService::new(Box::new(BrokenBackend));
        assert_eq!(service.backend_name(), "broken");

        let err = service
            .generate("q", &[], &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::GenerationFailure(_)));
        assert!(err.to_string().contains("model not loaded"));
    }
}
