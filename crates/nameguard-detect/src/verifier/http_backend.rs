//! HTTP completion backend for an Ollama-compatible inference server

use super::backend::CompletionBackend;
use async_trait::async_trait;
use nameguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Backend that talks to an Ollama server over its generate API
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    ready: AtomicBool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            max_tokens,
            ready: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    /// Probe the server's tag list for the configured model
    async fn load(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "inference server unreachable");
                return Ok(false);
            }
        };

        let tags: TagsResponse = match response.json().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "bad tag list from inference server");
                return Ok(false);
            }
        };

        // Ollama model names carry a ":tag" suffix
        let available = tags
            .models
            .iter()
            .any(|m| m.name == self.model || m.name.starts_with(&format!("{}:", self.model)));

        if available {
            tracing::info!(model = %self.model, "inference server ready");
        } else {
            tracing::warn!(model = %self.model, "model not present on inference server");
        }
        self.ready.store(available, Ordering::SeqCst);
        Ok(available)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if !self.is_ready() {
            return Err(Error::verifier("inference server backend not loaded"));
        }

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::verifier(format!("generate request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::verifier(format!("generate request rejected: {}", e)))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::verifier(format!("bad generate response: {}", e)))?;

        Ok(body.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_requires_load() {
        let backend = OllamaBackend::new("http://localhost:11434", "mamaylm", 0.1, 150);
        assert!(!backend.is_ready());
        assert!(backend.complete("prompt").await.is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let backend = OllamaBackend::new("http://localhost:11434/", "mamaylm", 0.1, 150);
        assert_eq!(backend.base_url, "http://localhost:11434");
    }
}
