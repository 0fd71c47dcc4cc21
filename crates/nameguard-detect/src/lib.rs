//! NameGuard Detect
//!
//! The multi-tier name detection cascade for payment comments:
//! - Tier 1 (quick filter): regex screening of obvious no-name comments
//! - Tier 2 (NER): a rule adapter and a transformer adapter, arbitrated
//! - Tier 3 (verifier): a generative model consulted for low-confidence answers
//!
//! All tiers degrade gracefully; a request always yields a result.

pub mod cache;
pub mod config;
pub mod model_loader;
pub mod ner_adapter;
pub mod patterns;
pub mod pipeline;
pub mod quick_filter;
pub mod segmentation;
pub mod tagger;
pub mod verifier;

pub use cache::{CacheStats, ResultCache};
pub use config::{
    CacheConfig, DetectorConfig, TaggerConfig, VerifierBackendKind, VerifierConfig,
};
pub use model_loader::{ModelLocation, TokenClassificationTagger};
pub use ner_adapter::{arbitrate, RuleNerAdapter, TransformerNerAdapter};
pub use patterns::PatternMatcher;
pub use pipeline::{split_free_text, DetectionPipeline};
pub use quick_filter::QuickFilter;
pub use segmentation::PatternExtractor;
pub use tagger::{LexicalPersonTagger, PersonSpan, PersonTagger};
pub use verifier::{
    CompletionBackend, GenerativeVerifier, GgufBackend, GgufSource, OllamaBackend, VerifyOutcome,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::ResultCache;
    pub use crate::config::DetectorConfig;
    pub use crate::ner_adapter::{RuleNerAdapter, TransformerNerAdapter};
    pub use crate::patterns::PatternMatcher;
    pub use crate::pipeline::DetectionPipeline;
    pub use crate::tagger::{LexicalPersonTagger, PersonTagger};
    pub use crate::verifier::{GenerativeVerifier, VerifyOutcome};
}
