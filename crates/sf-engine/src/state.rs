//! Player state with exportable/importable JSON snapshots

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Player state carried across spins.
///
/// The public document is what a client would see (balances, unlocked
/// features); the private document holds engine internals (pending feature
/// state, accumulators). Both round-trip through JSON so a worker can roll
/// a failed spin back to the exact prior state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub public: serde_json::Value,
    pub private: serde_json::Value,
}

/// Exported snapshot of both documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub public: String,
    pub private: String,
}

impl PlayerState {
    pub fn new(public: serde_json::Value, private: serde_json::Value) -> Self {
        Self { public, private }
    }

    /// Export the public document as JSON
    pub fn export_public(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(&self.public)?)
    }

    /// Export the private document as JSON
    pub fn export_private(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(&self.private)?)
    }

    /// Import the public document from JSON
    pub fn import_public(&mut self, json: &str) -> EngineResult<()> {
        self.public = serde_json::from_str(json)?;
        Ok(())
    }

    /// Import the private document from JSON
    pub fn import_private(&mut self, json: &str) -> EngineResult<()> {
        self.private = serde_json::from_str(json)?;
        Ok(())
    }

    /// Export both documents
    pub fn snapshot(&self) -> EngineResult<PlayerSnapshot> {
        Ok(PlayerSnapshot {
            public: self.export_public()?,
            private: self.export_private()?,
        })
    }

    /// Restore both documents from a snapshot
    pub fn restore(&mut self, snapshot: &PlayerSnapshot) -> EngineResult<()> {
        self.import_public(&snapshot.public)?;
        self.import_private(&snapshot.private)?;
        Ok(())
    }
}
