//! Error types for generation providers.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a generation provider.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider name in configuration is not one we know.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider API error (non-success status or an error payload).
    #[error("provider API error: {0}")]
    ProviderApi(String),

    /// Request failed before a response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// A streamed line could not be decoded.
    #[error("malformed stream chunk: {0}")]
    MalformedChunk(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
