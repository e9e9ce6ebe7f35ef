//! Error types for the processor module

use std::time::Duration;

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for summarization.
///
/// `Summarizer::summarize` never returns these; they are logged and replaced
/// by truncation. Only `InvalidDetailLevel` reaches callers.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Completion service error
    #[error("LLM error: {0}")]
    Llm(#[from] rig::completion::CompletionError),

    /// The completion service did not answer in time
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    /// The completion service answered with no text
    #[error("LLM returned an empty summary")]
    EmptyResponse,

    /// Detail level outside 1..=5
    #[error("Detail level must be between 1 and 5, got {0}")]
    InvalidDetailLevel(u8),
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::InvalidDetailLevel(_) => CrateError::InvalidRequest(err.to_string()),
            _ => CrateError::Other(err.to_string()),
        }
    }
}
