//! Error types for run-state storage

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for progress and stop-flag storage
#[derive(Debug, Error)]
pub enum StateError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// A lock holder panicked
    #[error("Run state lock poisoned")]
    Poisoned,
}

impl From<StateError> for CrateError {
    fn from(err: StateError) -> Self {
        CrateError::RunState(err.to_string())
    }
}
