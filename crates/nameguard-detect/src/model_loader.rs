//! Transformer-backed person tagger
//!
//! Loads a BERT-family token-classification model through candle and exposes
//! it as a [`PersonTagger`]. Weights come from a local directory or the
//! HuggingFace Hub. Without the `ml-models` feature the tagger reports not
//! ready and the cascade runs on the lexical tagger alone.

use crate::tagger::{PersonSpan, PersonTagger};
use async_trait::async_trait;
use nameguard_core::{Error, Result};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "ml-models")]
use candle_core::{Device, Tensor};
#[cfg(feature = "ml-models")]
use candle_nn::{Linear, Module, VarBuilder};
#[cfg(feature = "ml-models")]
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
#[cfg(feature = "ml-models")]
use std::collections::HashMap;
#[cfg(feature = "ml-models")]
use tokenizers::Tokenizer;

/// Where the tagger's weights come from
#[derive(Debug, Clone)]
pub enum ModelLocation {
    Local { path: PathBuf },
    HuggingFace { repo: String, revision: String },
}

/// BERT token-classification tagger for person entities
pub struct TokenClassificationTagger {
    location: ModelLocation,
    device_name: String,
    max_length: usize,
    #[cfg(feature = "ml-models")]
    state: RwLock<Option<Arc<LoadedModel>>>,
    #[cfg(not(feature = "ml-models"))]
    state: RwLock<Option<()>>,
}

impl TokenClassificationTagger {
    pub fn new(location: ModelLocation, device: impl Into<String>, max_length: usize) -> Self {
        Self {
            location,
            device_name: device.into(),
            max_length,
            state: RwLock::new(None),
        }
    }
}

#[async_trait]
impl PersonTagger for TokenClassificationTagger {
    async fn load(&self) -> Result<bool> {
        #[cfg(feature = "ml-models")]
        {
            if self.state.read().is_some() {
                return Ok(true);
            }
            let location = self.location.clone();
            let device_name = self.device_name.clone();
            let loaded = tokio::task::spawn_blocking(move || load_model(&location, &device_name))
                .await
                .map_err(|e| Error::tagger(format!("model load task failed: {}", e)))?;
            match loaded {
                Ok(model) => {
                    tracing::info!(tagger = self.name(), "loaded token classification model");
                    *self.state.write() = Some(Arc::new(model));
                    Ok(true)
                }
                Err(e) => {
                    tracing::warn!(tagger = self.name(), error = %e, "model load failed");
                    Ok(false)
                }
            }
        }

        #[cfg(not(feature = "ml-models"))]
        {
            tracing::info!(
                tagger = self.name(),
                "built without 'ml-models' feature, tagger disabled"
            );
            Ok(false)
        }
    }

    fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }

    async fn tag_persons(&self, text: &str) -> Result<Vec<PersonSpan>> {
        #[cfg(feature = "ml-models")]
        {
            let model = self
                .state
                .read()
                .clone()
                .ok_or_else(|| Error::tagger("token classification model not loaded"))?;
            let text = text.to_string();
            let max_length = self.max_length;
            // Inference is CPU-bound, keep it off the async workers
            tokio::task::spawn_blocking(move || model.tag_persons(&text, max_length))
                .await
                .map_err(|e| Error::tagger(format!("tagger task failed: {}", e)))?
        }

        #[cfg(not(feature = "ml-models"))]
        {
            let _ = text;
            Err(Error::tagger(
                "token classification requires 'ml-models' feature",
            ))
        }
    }

    fn name(&self) -> &str {
        "token-classification"
    }
}

#[cfg(feature = "ml-models")]
struct LoadedModel {
    tokenizer: Tokenizer,
    model: BertModel,
    head: Linear,
    device: Device,
    id2label: HashMap<usize, String>,
}

#[cfg(feature = "ml-models")]
impl LoadedModel {
    fn tag_persons(&self, text: &str, max_length: usize) -> Result<Vec<PersonSpan>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::tagger(format!("tokenization failed: {}", e)))?;

        let seq_len = encoding.get_ids().len().min(max_length);
        let ids = &encoding.get_ids()[..seq_len];
        let type_ids = &encoding.get_type_ids()[..seq_len];
        let offsets = &encoding.get_offsets()[..seq_len];

        let input_ids = Tensor::new(ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::tagger(format!("failed to build input tensor: {}", e)))?;
        let token_type_ids = Tensor::new(type_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::tagger(format!("failed to build type tensor: {}", e)))?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(|e| Error::tagger(format!("forward pass failed: {}", e)))?;

        // Per-token label logits, softmaxed so span scores are probabilities
        let logits = self
            .head
            .forward(&hidden)
            .map_err(|e| Error::tagger(format!("classification head failed: {}", e)))?;
        let probs = candle_nn::ops::softmax(&logits, 2)
            .and_then(|p| p.squeeze(0))
            .map_err(|e| Error::tagger(format!("softmax failed: {}", e)))?;
        let probs = probs
            .to_vec2::<f32>()
            .map_err(|e| Error::tagger(format!("failed to read logits: {}", e)))?;

        let mut spans: Vec<PersonSpan> = Vec::new();
        let mut current: Option<(usize, usize, f32, usize)> = None;

        for (idx, token_probs) in probs.iter().enumerate() {
            let (label_id, score) = argmax(token_probs);
            let (start, end) = offsets[idx];
            let is_person = self
                .id2label
                .get(&label_id)
                .map(|l| l.contains("PER"))
                .unwrap_or(false);

            // Special tokens carry zero-width offsets and never extend a span
            if is_person && end > start {
                current = Some(match current {
                    Some((s, _, sum, n)) => (s, end, sum + score, n + 1),
                    None => (start, end, score, 1),
                });
            } else if let Some((s, e, sum, n)) = current.take() {
                spans.push(span_from_range(text, s, e, sum / n as f32));
            }
        }
        if let Some((s, e, sum, n)) = current {
            spans.push(span_from_range(text, s, e, sum / n as f32));
        }

        Ok(spans)
    }
}

#[cfg(feature = "ml-models")]
fn span_from_range(text: &str, start: usize, end: usize, score: f32) -> PersonSpan {
    let span_text = text[start..end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    PersonSpan::new(span_text, score, start, end)
}

#[cfg(feature = "ml-models")]
fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = (0usize, f32::MIN);
    for (i, &v) in values.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

#[cfg(feature = "ml-models")]
fn load_model(location: &ModelLocation, device_name: &str) -> Result<LoadedModel> {
    let model_dir = resolve_model_dir(location)?;

    let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
        .map_err(|e| Error::tagger(format!("failed to load tokenizer: {}", e)))?;

    let config_text = std::fs::read_to_string(model_dir.join("config.json"))
        .map_err(|e| Error::tagger(format!("failed to read model config: {}", e)))?;
    let bert_config: BertConfig = serde_json::from_str(&config_text)
        .map_err(|e| Error::tagger(format!("failed to parse model config: {}", e)))?;
    let id2label = parse_id2label(&config_text)?;

    let device = match device_name {
        "cuda" => Device::new_cuda(0)
            .map_err(|e| Error::tagger(format!("failed to initialize CUDA: {}", e)))?,
        "mps" => Device::new_metal(0)
            .map_err(|e| Error::tagger(format!("failed to initialize Metal: {}", e)))?,
        _ => Device::Cpu,
    };

    let weights = model_dir.join("model.safetensors");
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights], candle_core::DType::F32, &device)
            .map_err(|e| Error::tagger(format!("failed to load weights: {}", e)))?
    };

    let model = BertModel::load(vb.pp("bert"), &bert_config)
        .map_err(|e| Error::tagger(format!("failed to load BERT encoder: {}", e)))?;
    let head = candle_nn::linear(
        bert_config.hidden_size,
        id2label.len(),
        vb.pp("classifier"),
    )
    .map_err(|e| Error::tagger(format!("failed to load classification head: {}", e)))?;

    Ok(LoadedModel {
        tokenizer,
        model,
        head,
        device,
        id2label,
    })
}

#[cfg(feature = "ml-models")]
fn parse_id2label(config_text: &str) -> Result<HashMap<usize, String>> {
    #[derive(serde::Deserialize)]
    struct LabelConfig {
        id2label: HashMap<String, String>,
    }

    let parsed: LabelConfig = serde_json::from_str(config_text)
        .map_err(|e| Error::tagger(format!("model config has no id2label table: {}", e)))?;

    parsed
        .id2label
        .into_iter()
        .map(|(k, v)| {
            k.parse::<usize>()
                .map(|id| (id, v))
                .map_err(|e| Error::tagger(format!("bad label id '{}': {}", k, e)))
        })
        .collect()
}

#[cfg(feature = "ml-models")]
fn resolve_model_dir(location: &ModelLocation) -> Result<PathBuf> {
    match location {
        ModelLocation::Local { path } => {
            if !path.exists() {
                return Err(Error::tagger(format!(
                    "model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelLocation::HuggingFace { repo, revision } => {
            tracing::info!(repo = %repo, revision = %revision, "downloading tagger model");

            let api = hf_hub::api::sync::Api::new()
                .map_err(|e| Error::tagger(format!("failed to initialize hub API: {}", e)))?;
            let repo_obj = api.repo(hf_hub::Repo::with_revision(
                repo.clone(),
                hf_hub::RepoType::Model,
                revision.clone(),
            ));

            let mut config_path = None;
            for file in ["config.json", "tokenizer.json", "model.safetensors"] {
                let path = repo_obj
                    .get(file)
                    .map_err(|e| Error::tagger(format!("failed to download {}: {}", file, e)))?;
                if file == "config.json" {
                    config_path = Some(path);
                }
            }

            config_path
                .and_then(|p| p.parent().map(|d| d.to_path_buf()))
                .ok_or_else(|| Error::tagger("hub cache returned an invalid path"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_ready_before_load() {
        let tagger = TokenClassificationTagger::new(
            ModelLocation::Local {
                path: PathBuf::from("./models/does-not-exist"),
            },
            "cpu",
            512,
        );

        assert!(!tagger.is_ready());
        assert!(tagger.tag_persons("Іванов Петро").await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_model_reports_unavailable() {
        let tagger = TokenClassificationTagger::new(
            ModelLocation::Local {
                path: PathBuf::from("./models/does-not-exist"),
            },
            "cpu",
            512,
        );

        // A missing model degrades the tagger instead of failing startup
        let ready = tagger.load().await.unwrap();
        assert!(!ready);
        assert!(!tagger.is_ready());
    }
}
