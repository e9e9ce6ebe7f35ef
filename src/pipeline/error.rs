//! Error types for the ingestion pipeline

use crate::error::Error as CrateError;
use crate::fetcher::FetchError;
use crate::knowledge::StoreError;
use thiserror::Error;

/// Failures that reach the caller of a training operation
#[derive(Debug, Error)]
pub enum IngestError {
    /// Every fetch strategy failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Extracted text below the minimum length; nothing was stored
    #[error("Content of {url} is too short: {chars} characters, at least {min} required")]
    ContentTooShort { url: String, chars: usize, min: usize },

    /// Knowledge store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// URL could not be parsed
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request parameters out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<IngestError> for CrateError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Fetch(e) => e.into(),
            IngestError::Store(e) => e.into(),
            IngestError::ContentTooShort { .. } => CrateError::ContentTooShort(err.to_string()),
            IngestError::InvalidUrl { .. } | IngestError::InvalidRequest(_) => {
                CrateError::InvalidRequest(err.to_string())
            }
        }
    }
}
