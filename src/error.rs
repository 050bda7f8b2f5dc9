//! Error types for the sync engine

use thiserror::Error;

/// Errors that can occur when talking to a blockchain data provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider has no record for the address
    #[error("address {0} not found")]
    AddressNotFound(String),

    /// Provider signaled throttling (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimited,

    /// Network failure, timeout, or a non-success HTTP status other than 429
    #[error("provider unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// Anything else, with the original message preserved
    #[error("unexpected provider failure: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Creates an Unknown error
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
