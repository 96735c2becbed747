//! # sf-sim — Parallel spin simulation
//!
//! Drives an external [`sf_engine::GameEngine`] through millions of spins
//! and produces converged RTP and variance statistics.
//!
//! ## Architecture
//!
//! ```text
//! SimulationCoordinator
//!     │  splits total spins into shards,
//!     │  bounded pool of scoped worker threads
//!     v
//! SimulationWorker (one per in-flight shard)
//!     ├── RandomSource   (acquired from the shared SourcePool)
//!     ├── StatisticsTree (cloned from the template)
//!     └── ReturnDistribution (when variance tracking is on)
//!           │
//!           v  rendezvous channel, completion order
//!     merge → progress callback → AggregatedResult
//! ```
//!
//! Workers share nothing except the source pool and the coordinator's
//! sequential merge point; shard results transfer by ownership.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod worker;

pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use worker::*;
