//! Error types for NameGuard

/// Result type alias using NameGuard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for NameGuard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NER tagger errors (load or inference)
    #[error("tagger error: {0}")]
    Tagger(String),

    /// Generative verifier errors (backend call or parse)
    #[error("verifier error: {0}")]
    Verifier(String),

    /// Sanctions registry errors (parse or lookup state)
    #[error("sanctions error: {0}")]
    Sanctions(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new tagger error
    pub fn tagger(msg: impl Into<String>) -> Self {
        Self::Tagger(msg.into())
    }

    /// Create a new verifier error
    pub fn verifier(msg: impl Into<String>) -> Self {
        Self::Verifier(msg.into())
    }

    /// Create a new sanctions error
    pub fn sanctions(msg: impl Into<String>) -> Self {
        Self::Sanctions(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
