//! Error types for the fetcher module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response status outside 2xx/3xx
    #[error("Unexpected status {0}")]
    Status(u16),

    /// Response had no body
    #[error("Empty response body")]
    EmptyBody,

    /// URL could not be used for a request
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Every strategy in the chain failed
    #[error("All fetch strategies failed for {url}: {}", attempts.join("; "))]
    Exhausted {
        /// URL that could not be fetched
        url: String,
        /// One "strategy: reason" entry per attempt
        attempts: Vec<String>,
    },
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
