//! Error types for sf-rng

use thiserror::Error;

/// Random-source error type
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngError {
    #[error("Invalid draw bound: {0} (must be > 0)")]
    InvalidBound(i64),

    #[error("Invalid rollback tag")]
    InvalidTag,
}

/// Result type alias
pub type RngResult<T> = Result<T, RngError>;
