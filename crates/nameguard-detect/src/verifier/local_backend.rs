//! In-process GGUF completion backend
//!
//! Runs a quantized instruction-tuned model through candle. Weights load
//! from a local file or the HuggingFace Hub. The model holds a KV cache, so
//! generation takes the state lock for the whole completion; the verifier
//! serializes calls anyway.

use super::backend::CompletionBackend;
use super::prompt::STOP_SEQUENCES;
use async_trait::async_trait;
use nameguard_core::{Error, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "ml-models")]
use candle_core::{Device, Tensor};
#[cfg(feature = "ml-models")]
use candle_transformers::generation::LogitsProcessor;
#[cfg(feature = "ml-models")]
use candle_transformers::models::quantized_llama::ModelWeights;
#[cfg(feature = "ml-models")]
use tokenizers::Tokenizer;

/// Where the GGUF weights and tokenizer come from
#[derive(Debug, Clone)]
pub enum GgufSource {
    Local {
        model: PathBuf,
        tokenizer: PathBuf,
    },
    HuggingFace {
        repo: String,
        gguf_file: String,
    },
}

/// Quantized local model backend
pub struct GgufBackend {
    source: GgufSource,
    temperature: f32,
    max_tokens: usize,
    #[cfg(feature = "ml-models")]
    state: Arc<Mutex<Option<Loaded>>>,
    #[cfg(not(feature = "ml-models"))]
    state: Arc<Mutex<Option<()>>>,
}

impl GgufBackend {
    pub fn new(source: GgufSource, temperature: f32, max_tokens: usize) -> Self {
        Self {
            source,
            temperature,
            max_tokens,
            state: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl CompletionBackend for GgufBackend {
    async fn load(&self) -> Result<bool> {
        #[cfg(feature = "ml-models")]
        {
            if self.state.lock().is_some() {
                return Ok(true);
            }
            let source = self.source.clone();
            let loaded = tokio::task::spawn_blocking(move || Loaded::open(&source))
                .await
                .map_err(|e| Error::verifier(format!("model load task failed: {}", e)))?;
            match loaded {
                Ok(loaded) => {
                    tracing::info!("loaded quantized verifier model");
                    *self.state.lock() = Some(loaded);
                    Ok(true)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "quantized model load failed");
                    Ok(false)
                }
            }
        }

        #[cfg(not(feature = "ml-models"))]
        {
            tracing::info!("built without 'ml-models' feature, local verifier disabled");
            Ok(false)
        }
    }

    fn is_ready(&self) -> bool {
        self.state.lock().is_some()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        #[cfg(feature = "ml-models")]
        {
            if self.state.lock().is_none() {
                return Err(Error::verifier("quantized model not loaded"));
            }
            let state = Arc::clone(&self.state);
            let prompt = prompt.to_string();
            let temperature = self.temperature;
            let max_tokens = self.max_tokens;
            // Generation is CPU-bound, keep it off the async workers
            tokio::task::spawn_blocking(move || {
                let mut guard = state.lock();
                let loaded = guard
                    .as_mut()
                    .ok_or_else(|| Error::verifier("quantized model not loaded"))?;
                loaded.generate(&prompt, temperature, max_tokens)
            })
            .await
            .map_err(|e| Error::verifier(format!("generation task failed: {}", e)))?
        }

        #[cfg(not(feature = "ml-models"))]
        {
            let _ = prompt;
            Err(Error::verifier(
                "local generation requires 'ml-models' feature",
            ))
        }
    }

    fn name(&self) -> &str {
        "gguf"
    }
}

#[cfg(feature = "ml-models")]
struct Loaded {
    model: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
}

#[cfg(feature = "ml-models")]
impl Loaded {
    fn open(source: &GgufSource) -> Result<Self> {
        let (model_path, tokenizer_path) = resolve_paths(source)?;

        let mut file = std::fs::File::open(&model_path)
            .map_err(|e| Error::verifier(format!("failed to open GGUF file: {}", e)))?;
        let content = candle_core::quantized::gguf_file::Content::read(&mut file)
            .map_err(|e| Error::verifier(format!("failed to read GGUF metadata: {}", e)))?;

        let device = Device::Cpu;
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| Error::verifier(format!("failed to load GGUF weights: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::verifier(format!("failed to load tokenizer: {}", e)))?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn generate(&mut self, prompt: &str, temperature: f32, max_tokens: usize) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| Error::verifier(format!("prompt tokenization failed: {}", e)))?;
        let prompt_tokens = encoding.get_ids().to_vec();

        let mut sampler = LogitsProcessor::new(299792458, Some(temperature as f64), None);
        let eos_tokens: Vec<u32> = ["<end_of_turn>", "<eos>", "</s>"]
            .iter()
            .filter_map(|t| self.tokenizer.token_to_id(t))
            .collect();

        // Prompt pass fills the KV cache and yields the first sampled token
        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::verifier(format!("failed to build prompt tensor: {}", e)))?;
        let logits = self
            .model
            .forward(&input, 0)
            .and_then(|l| l.squeeze(0))
            .map_err(|e| Error::verifier(format!("prompt forward pass failed: {}", e)))?;
        let mut next = sampler
            .sample(&logits)
            .map_err(|e| Error::verifier(format!("sampling failed: {}", e)))?;

        let mut generated: Vec<u32> = Vec::with_capacity(max_tokens);
        let mut position = prompt_tokens.len();

        for _ in 0..max_tokens {
            if eos_tokens.contains(&next) {
                break;
            }
            generated.push(next);

            let text = self
                .tokenizer
                .decode(&generated, true)
                .map_err(|e| Error::verifier(format!("decoding failed: {}", e)))?;
            if let Some(cut) = STOP_SEQUENCES.iter().filter_map(|s| text.find(s)).min() {
                return Ok(text[..cut].to_string());
            }

            let input = Tensor::new(&[next], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| Error::verifier(format!("failed to build token tensor: {}", e)))?;
            let logits = self
                .model
                .forward(&input, position)
                .and_then(|l| l.squeeze(0))
                .map_err(|e| Error::verifier(format!("forward pass failed: {}", e)))?;
            next = sampler
                .sample(&logits)
                .map_err(|e| Error::verifier(format!("sampling failed: {}", e)))?;
            position += 1;
        }

        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| Error::verifier(format!("decoding failed: {}", e)))
    }
}

#[cfg(feature = "ml-models")]
fn resolve_paths(source: &GgufSource) -> Result<(PathBuf, PathBuf)> {
    match source {
        GgufSource::Local { model, tokenizer } => {
            for path in [model, tokenizer] {
                if !path.exists() {
                    return Err(Error::verifier(format!(
                        "model file does not exist: {}",
                        path.display()
                    )));
                }
            }
            Ok((model.clone(), tokenizer.clone()))
        }
        GgufSource::HuggingFace { repo, gguf_file } => {
            tracing::info!(repo = %repo, file = %gguf_file, "downloading verifier model");

            let api = hf_hub::api::sync::Api::new()
                .map_err(|e| Error::verifier(format!("failed to initialize hub API: {}", e)))?;
            let repo_obj = api.repo(hf_hub::Repo::model(repo.clone()));

            let model = repo_obj
                .get(gguf_file)
                .map_err(|e| Error::verifier(format!("failed to download {}: {}", gguf_file, e)))?;
            let tokenizer = repo_obj
                .get("tokenizer.json")
                .map_err(|e| Error::verifier(format!("failed to download tokenizer: {}", e)))?;
            Ok((model, tokenizer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_ready_before_load() {
        let backend = GgufBackend::new(
            GgufSource::Local {
                model: PathBuf::from("./models/missing.gguf"),
                tokenizer: PathBuf::from("./models/tokenizer.json"),
            },
            0.1,
            150,
        );

        assert!(!backend.is_ready());
        assert!(backend.complete("prompt").await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_weights_degrades() {
        let backend = GgufBackend::new(
            GgufSource::Local {
                model: PathBuf::from("./models/missing.gguf"),
                tokenizer: PathBuf::from("./models/tokenizer.json"),
            },
            0.1,
            150,
        );

        let ready = backend.load().await.unwrap();
        assert!(!ready);
    }
}
