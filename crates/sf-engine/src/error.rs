//! Error types for the engine boundary

use thiserror::Error;

/// Engine boundary error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid stake: {0}")]
    InvalidStake(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Play error: {0}")]
    Play(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
