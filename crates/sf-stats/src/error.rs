//! Error types for sf-stats

use thiserror::Error;

/// Statistics error type
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Tree shape mismatch on merge: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type StatsResult<T> = Result<T, StatsError>;
