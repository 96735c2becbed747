//! # sf-stats — Outcome classification and convergence statistics
//!
//! A [`StatisticsTree`] classifies every play-step result of a simulated
//! spin through a predicate-gated hierarchy of counters (game mode → tag →
//! symbol → run-length bucket) and accumulates trigger counts, win totals
//! and RTP per node. Trees built from the same [`TreeSpec`] merge by
//! summing identically-keyed nodes, so per-worker shards combine into one
//! aggregate in any order.
//!
//! A [`ReturnDistribution`] buckets normalized per-spin returns for
//! variance/standard-deviation reporting and retains the exact random
//! draws behind the best observed outcome.

pub mod distribution;
pub mod error;
pub mod report;
pub mod tree;

pub use distribution::*;
pub use error::*;
pub use report::*;
pub use tree::*;
