//! Tier 3 generative verifier
//!
//! Wraps a completion backend with admission control, serialization, and a
//! hard deadline. The verifier is best-effort: when it cannot answer in time
//! or at all, the cascade falls back to the NER tier's result rather than
//! failing the request.

mod backend;
mod http_backend;
mod local_backend;
mod parser;
mod prompt;

pub use backend::CompletionBackend;
pub use http_backend::OllamaBackend;
pub use local_backend::{GgufBackend, GgufSource};
pub use parser::CompletionParser;
pub use prompt::build_prompt;

use crate::patterns::PatternMatcher;
use nameguard_core::DetectionResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

/// What became of one verification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The backend answered and the completion parsed
    Answer(DetectionResult),
    /// The backend is not loaded
    Unavailable,
    /// Admission control was full, the request moved on without verifying
    Skipped,
    /// The deadline elapsed before the backend answered
    TimedOut,
    /// The backend errored
    Failed,
}

/// Generative verification stage
pub struct GenerativeVerifier {
    backend: Arc<dyn CompletionBackend>,
    parser: CompletionParser,
    patterns: Arc<PatternMatcher>,
    admission: Semaphore,
    gate: Mutex<()>,
    timeout: Duration,
}

impl GenerativeVerifier {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        patterns: Arc<PatternMatcher>,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            parser: CompletionParser::new(),
            patterns,
            admission: Semaphore::new(max_concurrent),
            gate: Mutex::new(()),
            timeout,
        }
    }

    /// Load the underlying backend; returns whether verification is available
    pub async fn load(&self) -> nameguard_core::Result<bool> {
        self.backend.load().await
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    /// Verify one comment, bounded by admission control and the deadline
    pub async fn verify(&self, text: &str) -> VerifyOutcome {
        if !self.backend.is_ready() {
            return VerifyOutcome::Unavailable;
        }

        // Over-subscription skips verification instead of queueing behind it
        let _permit = match self.admission.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("verifier admission full, skipping");
                return VerifyOutcome::Skipped;
            }
        };

        let prompt = build_prompt(text);

        // The deadline covers waiting for the model gate as well as the
        // completion itself
        let completion = tokio::time::timeout(self.timeout, async {
            let _gate = self.gate.lock().await;
            self.backend.complete(&prompt).await
        })
        .await;

        match completion {
            Ok(Ok(output)) => {
                let result = self.parser.parse(&output, text, &self.patterns);
                VerifyOutcome::Answer(result)
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "verifier failed");
                VerifyOutcome::Failed
            }
            Err(_) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "verifier deadline elapsed"
                );
                VerifyOutcome::TimedOut
            }
        }
    }
}
