//! Error types for the driftwatch monitoring engine

use thiserror::Error;

/// Result type alias for driftwatch operations
pub type Result<T> = std::result::Result<T, DriftwatchError>;

/// Main error type for the driftwatch crate
#[derive(Error, Debug)]
pub enum DriftwatchError {
    /// A column required for a comparison or join is missing from one side.
    /// Fatal to the run; never retried.
    #[error("Schema mismatch: column '{column}' missing from {side} data")]
    SchemaMismatch { column: String, side: String },

    /// A column's values are incompatible with its declared role.
    #[error("Type mismatch in column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// A statistical test could not be computed (degenerate input).
    /// Caught per feature by the drift detector; fatal elsewhere.
    #[error("Statistical computation failed: {0}")]
    StatisticalComputation(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<polars::error::PolarsError> for DriftwatchError {
    fn from(err: polars::error::PolarsError) -> Self {
        DriftwatchError::Data(err.to_string())
    }
}
