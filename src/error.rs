//! Error types shared across the crate.

use ethers::providers::ProviderError;
use thiserror::Error;

/// An entity or action that is missing a required key field, or whose key
/// field is not well-formed. Raised at the boundary, before anything reaches
/// the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {entity}: {reason}")]
pub struct MalformedEntityError {
    pub entity: &'static str,
    pub reason: String,
}

impl MalformedEntityError {
    pub fn new(entity: &'static str, reason: impl Into<String>) -> Self {
        Self {
            entity,
            reason: reason.into(),
        }
    }
}

/// Failures talking to the external entity source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("rpc error: {0}")]
    Rpc(#[from] ProviderError),

    #[error(transparent)]
    Malformed(#[from] MalformedEntityError),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}
