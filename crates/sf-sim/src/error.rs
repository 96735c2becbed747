//! Error types for sf-sim

use thiserror::Error;

/// Simulation error type
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Engine error: {0}")]
    Engine(#[from] sf_engine::EngineError),

    #[error("Statistics error: {0}")]
    Stats(#[from] sf_stats::StatsError),

    #[error("Random source error: {0}")]
    Rng(#[from] sf_rng::RngError),

    #[error("Invalid run: {0}")]
    InvalidRun(String),

    #[error("Worker disconnected before completing its shard")]
    WorkerLost,
}

/// Result type alias
pub type SimResult<T> = Result<T, SimError>;
