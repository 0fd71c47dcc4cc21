//! Completion backend abstraction for the generative verifier
//!
//! The verifier is backend-agnostic: it builds a prompt, asks a backend for
//! a completion, and parses whatever comes back. Backends cover a local GGUF
//! model and an HTTP inference server.

use async_trait::async_trait;
use nameguard_core::Result;

/// A single-turn text completion provider
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Prepare the backend; returns whether it can serve completions
    async fn load(&self) -> Result<bool>;

    /// True once [`complete`](Self::complete) can be called
    fn is_ready(&self) -> bool;

    /// Generate a completion for the prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}
