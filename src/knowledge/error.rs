//! # Knowledge Store Error Types
//!
//! Failures of the libsql-backed knowledge store. Unlike fetch and summarize
//! failures these have no safe default, so they propagate to the caller.

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for knowledge store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Metadata (de)serialization error
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<StoreError> for CrateError {
    fn from(err: StoreError) -> Self {
        CrateError::Store(err.to_string())
    }
}
