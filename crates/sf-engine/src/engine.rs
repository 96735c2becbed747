//! The consumed game-engine capability set

use sf_rng::RandomSource;

use crate::error::EngineResult;
use crate::result::{PlayResult, Stake};
use crate::state::PlayerState;

/// External game-rules engine driven by the simulation core.
///
/// The engine decides wins, features and next commands; the core supplies
/// randomness, player state and stakes, and consumes [`PlayResult`] steps.
/// Randomness pooling is handled by [`sf_rng::SourcePool`] on the caller
/// side.
pub trait GameEngine: Send + Sync {
    /// Per-session game data, created per shard and owned by one worker
    type Session: Send;

    /// Fresh player state for a new session
    fn new_player_state(&self) -> PlayerState {
        PlayerState::default()
    }

    /// Validate a stake against the engine's configuration
    fn check_stake(&self, stake: &Stake) -> EngineResult<()> {
        stake.validate()
    }

    /// Create per-session game data for the given stake
    fn new_session(&self, stake: &Stake) -> EngineResult<Self::Session>;

    /// Execute one play step.
    ///
    /// `prior` holds the results already produced in this spin's sequence.
    /// `Ok(None)` means the engine produced no step; callers treat it like
    /// a failed step.
    #[allow(clippy::too_many_arguments)]
    fn play(
        &self,
        source: &mut dyn RandomSource,
        command: &str,
        command_params: &str,
        player: &mut PlayerState,
        stake: &Stake,
        prior: &[PlayResult],
        session: &mut Self::Session,
    ) -> EngineResult<Option<PlayResult>>;
}
