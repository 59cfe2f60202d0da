//! Record store error types
//!
//! Defines all errors that can escape the storage and ingestion layers.
//! Row-level parse failures are not listed here; they are counted and logged
//! by the ingestion pipeline and never abort a load.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited source could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Month argument outside 1-12
    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    /// The manifest listing source files could not be read
    #[error("Failed to read manifest {path:?}: {error}")]
    Manifest { path: PathBuf, error: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Validate a 1-based month number
pub fn check_month(month: u32) -> StoreResult<u32> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(StoreError::InvalidMonth(month))
    }
}
