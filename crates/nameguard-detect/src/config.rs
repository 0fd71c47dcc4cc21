//! Detector configuration
//!
//! Everything the cascade needs to build itself: thresholds, verifier
//! backend selection and sampling parameters, cache sizing, and model
//! locations. Deserializes from YAML with per-field defaults so a partial
//! config file is always valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the detection cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum Tier-2 confidence that avoids verifier escalation
    #[serde(default = "default_verification_threshold")]
    pub verification_threshold: f32,

    /// Minimum tagger score for a span to count as a person mention
    #[serde(default = "default_ner_confidence_threshold")]
    pub ner_confidence_threshold: f32,

    /// Transformer tagger settings
    #[serde(default)]
    pub tagger: TaggerConfig,

    /// Generative verifier settings
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Sanctions registry table, tab-delimited
    #[serde(default = "default_sanctions_path")]
    pub sanctions_path: PathBuf,
}

/// Transformer token-classification tagger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    /// Whether to load the transformer tagger at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hub repository of the token-classification model
    #[serde(default = "default_tagger_repo")]
    pub model_repo: String,

    /// Local model directory, overrides the hub repository when set
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Inference device, `cpu` or `cuda`
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum tokens fed to the model per comment
    #[serde(default = "default_max_input_length")]
    pub max_input_length: usize,
}

/// Which transport carries verifier completions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierBackendKind {
    /// POST completions to a local inference server
    Http,
    /// Load the quantized model in-process
    Local,
}

/// Generative verifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Whether Tier 3 participates in the cascade at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backend transport
    #[serde(default = "default_backend")]
    pub backend: VerifierBackendKind,

    /// Inference server base URL, used by the `http` backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Served model name, used by the `http` backend
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Hub repository of the quantized model, used by the `local` backend
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// GGUF file within the repository, used by the `local` backend
    #[serde(default = "default_model_file")]
    pub model_file: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion length cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Hard deadline per verification, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Verifier requests admitted system-wide before skipping
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entries retained before least-recently-used eviction
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl DetectorConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Verifier deadline as a [`Duration`]
    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier.timeout_secs)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            verification_threshold: default_verification_threshold(),
            ner_confidence_threshold: default_ner_confidence_threshold(),
            tagger: TaggerConfig::default(),
            verifier: VerifierConfig::default(),
            cache: CacheConfig::default(),
            sanctions_path: default_sanctions_path(),
        }
    }
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_repo: default_tagger_repo(),
            model_path: None,
            device: default_device(),
            max_input_length: default_max_input_length(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_backend(),
            backend_url: default_backend_url(),
            model_name: default_model_name(),
            model_repo: default_model_repo(),
            model_file: default_model_file(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
        }
    }
}

fn default_verification_threshold() -> f32 {
    0.85
}

fn default_ner_confidence_threshold() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_tagger_repo() -> String {
    "EvanD/xlm-roberta-base-ukrainian-ner-ukrner".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_input_length() -> usize {
    512
}

fn default_backend() -> VerifierBackendKind {
    VerifierBackendKind::Http
}

fn default_backend_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "mamaylm:latest".to_string()
}

fn default_model_repo() -> String {
    "INSAIT-Institute/MamayLM-Gemma-3-4B-IT-v1.0-GGUF".to_string()
}

fn default_model_file() -> String {
    "MamayLM-Gemma-3-4B-IT-v1.0.Q4_K_M.gguf".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> usize {
    150
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    2
}

fn default_cache_capacity() -> usize {
    10_000
}

fn default_sanctions_path() -> PathBuf {
    PathBuf::from("data/sanctions.tsv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.verification_threshold, 0.85);
        assert_eq!(config.ner_confidence_threshold, 0.7);
        assert_eq!(config.verifier.backend, VerifierBackendKind::Http);
        assert_eq!(config.verifier.max_concurrent, 2);
        assert_eq!(config.cache.capacity, 10_000);
        assert!(config.tagger.enabled);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
verification_threshold: 0.9
verifier:
  backend: local
  timeout_secs: 10
"#;
        let config = DetectorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.verification_threshold, 0.9);
        assert_eq!(config.verifier.backend, VerifierBackendKind::Local);
        assert_eq!(config.verifier_timeout(), Duration::from_secs(10));
        assert_eq!(config.verifier.max_tokens, 150);
        assert_eq!(config.cache.capacity, 10_000);
    }

    #[test]
    fn test_empty_yaml_is_valid() {
        let config = DetectorConfig::from_yaml("{}").unwrap();
        assert!(config.verifier.enabled);
        assert_eq!(config.verifier.model_name, "mamaylm:latest");
    }
}
