//! Play-step results and stakes

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Stake for one spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    /// Total cash bet per spin
    pub cash_bet: f64,
}

impl Stake {
    pub fn new(cash_bet: f64) -> Self {
        Self { cash_bet }
    }

    /// Basic structural validation shared by all engines
    pub fn validate(&self) -> EngineResult<()> {
        if self.cash_bet <= 0.0 || !self.cash_bet.is_finite() {
            return Err(EngineError::InvalidStake(format!(
                "cash bet must be positive and finite, got {}",
                self.cash_bet
            )));
        }
        Ok(())
    }
}

/// One winning entry within a play step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinEntry {
    /// Symbol identifier
    pub symbol: u32,
    /// Symbol run length (e.g. 3-of-a-kind)
    pub count: u8,
    /// Cash win for this entry
    pub cash_win: f64,
}

/// One step of a play sequence as reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayResult {
    /// Cash win amount for this step
    pub cash_win: f64,
    /// Terminal step of the play sequence
    pub is_finish: bool,
    /// Sequence paused awaiting player input
    pub is_waiting: bool,
    /// Candidate next commands (zero, one, or many)
    pub next_commands: Vec<String>,
    /// Per-win-entry breakdown
    pub wins: Vec<WinEntry>,
    /// Game mode tag active for this step
    pub game_mode: String,
}

impl PlayResult {
    /// A terminal step in the given mode
    pub fn finished(game_mode: impl Into<String>, cash_win: f64) -> Self {
        Self {
            cash_win,
            is_finish: true,
            is_waiting: false,
            next_commands: Vec::new(),
            wins: Vec::new(),
            game_mode: game_mode.into(),
        }
    }

    /// A non-terminal step continuing with the given commands
    pub fn continuing(
        game_mode: impl Into<String>,
        cash_win: f64,
        next_commands: Vec<String>,
    ) -> Self {
        Self {
            cash_win,
            is_finish: false,
            is_waiting: false,
            next_commands,
            wins: Vec::new(),
            game_mode: game_mode.into(),
        }
    }

    /// Attach win entries
    pub fn with_wins(mut self, wins: Vec<WinEntry>) -> Self {
        self.wins = wins;
        self
    }

    /// Does this step end the play sequence?
    pub fn is_terminal(&self) -> bool {
        self.is_finish || self.is_waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_validation() {
        assert!(Stake::new(100.0).validate().is_ok());
        assert!(Stake::new(0.0).validate().is_err());
        assert!(Stake::new(-1.0).validate().is_err());
        assert!(Stake::new(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_terminal_steps() {
        assert!(PlayResult::finished("base", 0.0).is_terminal());
        let mut waiting = PlayResult::continuing("base", 0.0, vec!["gamble".into()]);
        assert!(!waiting.is_terminal());
        waiting.is_waiting = true;
        assert!(waiting.is_terminal());
    }
}
