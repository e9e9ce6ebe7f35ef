//! Error types for the scribe crate

use thiserror::Error;

/// Result type for scribe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for scribe operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every fetch strategy failed for a URL
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Extracted content was below the minimum length
    #[error("Content too short: {0}")]
    ContentTooShort(String),

    /// Knowledge store error
    #[error("Store error: {0}")]
    Store(String),

    /// Progress/stop state error
    #[error("Run state error: {0}")]
    RunState(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
