//! Error types for the assessment engine.

use thiserror::Error;

use crate::pillar::Pillar;

/// Result type for assessment operations.
pub type Result<T> = std::result::Result<T, AssessmentError>;

/// Failures of a single provider operation.
///
/// Every variant is retried by [`RateLimitedCaller`](crate::RateLimitedCaller);
/// callers only ever observe [`ProviderError::RetriesExhausted`] or
/// [`ProviderError::Disabled`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider disabled: {0}")]
    Disabled(String),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: Box<ProviderError>,
    },
}

impl From<wellarch_models::Error> for ProviderError {
    fn from(err: wellarch_models::Error) -> Self {
        match err {
            wellarch_models::Error::Serialization(e) => ProviderError::Malformed(e.to_string()),
            other => ProviderError::Request(other.to_string()),
        }
    }
}

/// Errors raised by the assessment engine.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no concept catalog for pillar {pillar}")]
    CatalogMissing { pillar: Pillar },

    #[error("malformed corpus: {0}")]
    MalformedCorpus(String),

    #[error("degenerate subcategory input: {0}")]
    Normalization(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("assessment cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
