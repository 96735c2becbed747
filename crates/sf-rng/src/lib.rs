//! # sf-rng — Recorded, replayable random sources
//!
//! Every draw a simulation makes is recorded (raw bits, requested bound,
//! resulting value) so a spin can be audited and reproduced after the fact.
//! A recorded value sequence fed back as a replay cache on a fresh source
//! reproduces the identical draws for the same bound requests.
//!
//! ## Architecture
//!
//! ```text
//! RandomSource (capability trait)
//!     │
//!     ├── StdSource   — general purpose (StdRng)
//!     ├── FastSource  — sustained simulation load (SmallRng)
//!     └── LcgSource   — deterministic golden-file runs
//!           │
//!           v
//!     SourcePool (mutex-guarded idle set, factory-backed)
//! ```

pub mod error;
pub mod pool;
pub mod source;

pub use error::*;
pub use pool::*;
pub use source::*;
