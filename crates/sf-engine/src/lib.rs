//! # sf-engine — Game-engine collaborator boundary
//!
//! The simulation core never implements game rules; it drives an external
//! engine through this boundary. A [`GameEngine`] produces one
//! [`PlayResult`] per play step until it reports the sequence finished (or
//! waiting on player input), and carries per-session state in an
//! engine-defined `Session` type.
//!
//! [`PlayerState`] snapshots (public/private JSON documents) let a caller
//! roll the player back after a failed step.

pub mod engine;
pub mod error;
pub mod result;
pub mod state;

pub use engine::*;
pub use error::*;
pub use result::*;
pub use state::*;
