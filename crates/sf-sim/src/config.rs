//! Simulation run configuration

use serde::{Deserialize, Serialize};

/// Default shard count for sharded runs; independent of the worker count
/// and comfortably above it, so progress reporting stays fine-grained.
pub const DEFAULT_SHARD_COUNT: u64 = 100;

/// Runs below this many spins bypass sharding and execute on a single
/// synchronous worker.
pub const SINGLE_WORKER_THRESHOLD: u64 = 100;

/// Configuration for one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Command starting every spin's play sequence
    pub start_command: String,
    /// Opaque command parameters forwarded to the engine
    pub command_params: String,
    /// Track the return distribution for variance/standard deviation
    pub variance_tracking: bool,
    /// Clamp the cumulative win of a spin's result sequence to this
    /// ceiling before any accumulation; excess is discarded
    pub payout_cap: Option<f64>,
    /// Override the shard count for sharded runs
    pub shard_count: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_command: "spin".into(),
            command_params: String::new(),
            variance_tracking: false,
            payout_cap: None,
            shard_count: None,
        }
    }
}

impl SimConfig {
    /// Enable variance tracking
    pub fn with_variance(mut self) -> Self {
        self.variance_tracking = true;
        self
    }

    /// Set the payout cap
    pub fn with_payout_cap(mut self, cap: f64) -> Self {
        self.payout_cap = Some(cap);
        self
    }

    /// Effective shard count for a given total
    pub fn effective_shard_count(&self, total_spins: u64) -> u64 {
        self.shard_count
            .unwrap_or(DEFAULT_SHARD_COUNT)
            .clamp(1, total_spins.max(1))
    }
}
