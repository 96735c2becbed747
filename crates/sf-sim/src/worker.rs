//! Shard execution against the external game engine

use log::warn;

use sf_engine::{EngineError, GameEngine, PlayResult, Stake};
use sf_rng::RandomSource;
use sf_stats::{ReturnDistribution, StatisticsTree};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};

/// One worker's populated shard: a statistics snapshot plus running
/// totals, produced by exactly one worker and merged exactly once.
#[derive(Debug)]
pub struct ShardResult {
    /// Spins this shard was assigned (for progress accounting; a degraded
    /// shard still reports its assignment)
    pub assigned_spins: u64,
    pub stats: StatisticsTree,
    pub distribution: Option<ReturnDistribution>,
    /// Successfully completed spins
    pub bet_count: u64,
    pub total_bet: f64,
    pub total_win: f64,
}

impl ShardResult {
    /// Empty contribution from a worker that could not obtain a session
    pub fn empty(assigned_spins: u64, template: &StatisticsTree, variance: bool) -> Self {
        Self {
            assigned_spins,
            stats: template.clone(),
            distribution: variance.then(|| ReturnDistribution::new("run")),
            bet_count: 0,
            total_bet: 0.0,
            total_win: 0.0,
        }
    }
}

/// Runs one shard of spins: one random source, one cloned statistics
/// tree, one return distribution when variance tracking is enabled.
pub struct SimulationWorker<'a, E: GameEngine> {
    engine: &'a E,
    config: &'a SimConfig,
    stake: Stake,
}

impl<'a, E: GameEngine> SimulationWorker<'a, E> {
    pub fn new(engine: &'a E, config: &'a SimConfig, stake: Stake) -> Self {
        Self {
            engine,
            config,
            stake,
        }
    }

    /// Execute `spins` spins and emit the populated shard result.
    ///
    /// Spin-level engine failures roll the player state back and retry the
    /// same spin index; they never surface. A worker without a session
    /// degrades to an empty shard.
    pub fn run_shard(
        &self,
        spins: u64,
        source: &mut dyn RandomSource,
        template: &StatisticsTree,
    ) -> ShardResult {
        let variance = self.config.variance_tracking;
        let mut session = match self.engine.new_session(&self.stake) {
            Ok(session) => session,
            Err(error) => {
                warn!("shard degraded to empty: no session: {error}");
                return ShardResult::empty(spins, template, variance);
            }
        };

        let mut shard = ShardResult::empty(spins, template, variance);
        let mut player = self.engine.new_player_state();

        let mut completed = 0u64;
        while completed < spins {
            source.clear_recorded();
            let snapshot = match player.snapshot() {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    warn!("shard degraded after {completed} spins: snapshot failed: {error}");
                    break;
                }
            };

            match self.play_sequence(source, &mut player, &mut session) {
                Ok(mut results) => {
                    let spin_win = match self.config.payout_cap {
                        Some(cap) => apply_payout_cap(&mut results, cap),
                        None => results.iter().map(|r| r.cash_win).sum(),
                    };

                    for result in &results {
                        shard.stats.on_result(result);
                    }
                    shard.bet_count += 1;
                    shard.total_bet += self.stake.cash_bet;
                    shard.total_win += spin_win;

                    if let Some(distribution) = &mut shard.distribution {
                        distribution.add_return(spin_win / self.stake.cash_bet, source.recorded());
                    }
                    completed += 1;
                }
                Err(error) => {
                    // Transient engine failure: undo and retry this index
                    warn!("spin {completed} failed, rolling back and retrying: {error}");
                    if let Err(restore_error) = player.restore(&snapshot) {
                        warn!(
                            "shard degraded after {completed} spins: restore failed: {restore_error}"
                        );
                        break;
                    }
                }
            }
        }

        shard
    }

    /// Drive one spin's play sequence until the engine reports finished or
    /// waiting. With multiple candidate next commands, pick one with a
    /// recorded uniform draw so branchy sequences stay reproducible.
    fn play_sequence(
        &self,
        source: &mut dyn RandomSource,
        player: &mut sf_engine::PlayerState,
        session: &mut E::Session,
    ) -> SimResult<Vec<PlayResult>> {
        let mut results: Vec<PlayResult> = Vec::new();
        let mut command = self.config.start_command.clone();

        loop {
            let step = self
                .engine
                .play(
                    source,
                    &command,
                    &self.config.command_params,
                    player,
                    &self.stake,
                    &results,
                    session,
                )?
                .ok_or_else(|| {
                    SimError::Engine(EngineError::Play("engine produced no result".into()))
                })?;

            let terminal = step.is_terminal();
            let candidates = step.next_commands.clone();
            results.push(step);

            if terminal {
                break;
            }
            command = match candidates.as_slice() {
                [] => break,
                [only] => only.clone(),
                many => {
                    let index = source.draw(many.len() as i64)? as usize;
                    many[index].clone()
                }
            };
        }

        Ok(results)
    }
}

/// Clamp the cumulative win across a spin's result sequence to the cap
/// before any accumulation; the excess is discarded, never carried over.
/// Returns the clamped spin total.
fn apply_payout_cap(results: &mut [PlayResult], cap: f64) -> f64 {
    let mut running = 0.0;
    for step in results.iter_mut() {
        let allowed = (cap - running).max(0.0);
        if step.cash_win > allowed {
            step.cash_win = allowed;
        }
        // Win entries share the step's clamped ceiling
        let mut entry_running = 0.0;
        for win in &mut step.wins {
            let entry_allowed = (step.cash_win - entry_running).max(0.0);
            if win.cash_win > entry_allowed {
                win.cash_win = entry_allowed;
            }
            entry_running += win.cash_win;
        }
        running += step.cash_win;
    }
    running
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sf_engine::{EngineResult, PlayerState, WinEntry};
    use sf_rng::LcgSource;
    use sf_stats::{ModeSpec, SymbolSpec, TreeSpec};

    fn one_mode_template() -> StatisticsTree {
        StatisticsTree::build(&TreeSpec {
            modes: vec![ModeSpec::new("base", vec![SymbolSpec::new(1, vec![3])])],
        })
    }

    /// Always wins a fixed amount and finishes immediately
    struct FixedWinEngine {
        win: f64,
    }

    impl GameEngine for FixedWinEngine {
        type Session = ();

        fn new_session(&self, _stake: &Stake) -> EngineResult<()> {
            Ok(())
        }

        fn play(
            &self,
            _source: &mut dyn RandomSource,
            _command: &str,
            _params: &str,
            _player: &mut PlayerState,
            _stake: &Stake,
            _prior: &[PlayResult],
            _session: &mut (),
        ) -> EngineResult<Option<PlayResult>> {
            Ok(Some(PlayResult::finished("base", self.win).with_wins(vec![
                WinEntry {
                    symbol: 1,
                    count: 3,
                    cash_win: self.win,
                },
            ])))
        }
    }

    /// Two-step sequence (200 then 300), the first step continuing
    struct TwoStepEngine;

    impl GameEngine for TwoStepEngine {
        type Session = ();

        fn new_session(&self, _stake: &Stake) -> EngineResult<()> {
            Ok(())
        }

        fn play(
            &self,
            _source: &mut dyn RandomSource,
            _command: &str,
            _params: &str,
            _player: &mut PlayerState,
            _stake: &Stake,
            prior: &[PlayResult],
            _session: &mut (),
        ) -> EngineResult<Option<PlayResult>> {
            if prior.is_empty() {
                Ok(Some(PlayResult::continuing(
                    "base",
                    200.0,
                    vec!["feature".into()],
                )))
            } else {
                Ok(Some(PlayResult::finished("feature", 300.0)))
            }
        }
    }

    /// Fails every other play call, mutating player state before failing
    struct FlakyEngine;

    impl GameEngine for FlakyEngine {
        type Session = bool;

        fn new_player_state(&self) -> PlayerState {
            PlayerState::new(json!({}), json!({ "plays": 0 }))
        }

        fn new_session(&self, _stake: &Stake) -> EngineResult<bool> {
            Ok(false)
        }

        fn play(
            &self,
            _source: &mut dyn RandomSource,
            _command: &str,
            _params: &str,
            player: &mut PlayerState,
            _stake: &Stake,
            _prior: &[PlayResult],
            fail_next: &mut bool,
        ) -> EngineResult<Option<PlayResult>> {
            let plays = player.private["plays"].as_i64().unwrap_or(0);
            player.private["plays"] = json!(plays + 1);
            *fail_next = !*fail_next;
            if *fail_next {
                return Err(EngineError::Play("transient".into()));
            }
            Ok(Some(PlayResult::finished("base", 50.0)))
        }
    }

    /// Offers two next commands after the first step
    struct BranchyEngine;

    impl GameEngine for BranchyEngine {
        type Session = ();

        fn new_session(&self, _stake: &Stake) -> EngineResult<()> {
            Ok(())
        }

        fn play(
            &self,
            _source: &mut dyn RandomSource,
            _command: &str,
            _params: &str,
            _player: &mut PlayerState,
            _stake: &Stake,
            prior: &[PlayResult],
            _session: &mut (),
        ) -> EngineResult<Option<PlayResult>> {
            if prior.is_empty() {
                Ok(Some(PlayResult::continuing(
                    "base",
                    0.0,
                    vec!["left".into(), "right".into()],
                )))
            } else {
                Ok(Some(PlayResult::finished("base", 10.0)))
            }
        }
    }

    /// Never produces a session
    struct NoSessionEngine;

    impl GameEngine for NoSessionEngine {
        type Session = ();

        fn new_session(&self, _stake: &Stake) -> EngineResult<()> {
            Err(EngineError::Session("backend offline".into()))
        }

        fn play(
            &self,
            _source: &mut dyn RandomSource,
            _command: &str,
            _params: &str,
            _player: &mut PlayerState,
            _stake: &Stake,
            _prior: &[PlayResult],
            _session: &mut (),
        ) -> EngineResult<Option<PlayResult>> {
            unreachable!("no session was ever created")
        }
    }

    #[test]
    fn test_fixed_win_shard_totals() {
        let engine = FixedWinEngine { win: 100.0 };
        let config = SimConfig::default();
        let worker = SimulationWorker::new(&engine, &config, Stake::new(100.0));
        let template = one_mode_template();
        let mut source = LcgSource::with_seed(1627);

        let shard = worker.run_shard(50, &mut source, &template);
        assert_eq!(shard.assigned_spins, 50);
        assert_eq!(shard.bet_count, 50);
        assert_eq!(shard.total_bet, 5000.0);
        assert_eq!(shard.total_win, 5000.0);
        assert_eq!(shard.stats.root().triggers, 50);
        assert_eq!(shard.stats.root().total_win, 5000.0);
    }

    #[test]
    fn test_payout_cap_discards_excess() {
        // Sequence totals 500; cap 300 accumulates exactly 300
        let engine = TwoStepEngine;
        let config = SimConfig::default().with_payout_cap(300.0);
        let worker = SimulationWorker::new(&engine, &config, Stake::new(100.0));
        let template = one_mode_template();
        let mut source = LcgSource::with_seed(1627);

        let shard = worker.run_shard(2, &mut source, &template);
        // Excess is not carried to the next spin either
        assert_eq!(shard.total_win, 600.0);
        assert_eq!(shard.stats.root().total_win, 600.0);
    }

    #[test]
    fn test_apply_payout_cap_clamps_steps_and_entries() {
        let mut results = vec![
            PlayResult::finished("base", 200.0),
            PlayResult::finished("base", 300.0).with_wins(vec![
                WinEntry {
                    symbol: 1,
                    count: 3,
                    cash_win: 250.0,
                },
                WinEntry {
                    symbol: 2,
                    count: 4,
                    cash_win: 50.0,
                },
            ]),
        ];
        let total = apply_payout_cap(&mut results, 300.0);
        assert_eq!(total, 300.0);
        assert_eq!(results[0].cash_win, 200.0);
        assert_eq!(results[1].cash_win, 100.0);
        assert_eq!(results[1].wins[0].cash_win, 100.0);
        assert_eq!(results[1].wins[1].cash_win, 0.0);
    }

    #[test]
    fn test_transient_failures_retry_with_rollback() {
        let engine = FlakyEngine;
        let config = SimConfig::default();
        let worker = SimulationWorker::new(&engine, &config, Stake::new(10.0));
        let template = one_mode_template();
        let mut source = LcgSource::with_seed(1);

        let shard = worker.run_shard(10, &mut source, &template);
        // Every spin eventually succeeds; failures never surface
        assert_eq!(shard.bet_count, 10);
        assert_eq!(shard.total_win, 500.0);
    }

    #[test]
    fn test_flaky_engine_player_state_rolled_back() {
        let engine = FlakyEngine;
        let config = SimConfig::default();
        let stake = Stake::new(10.0);
        let mut player = engine.new_player_state();
        let mut session = engine.new_session(&stake).unwrap();
        let mut source = LcgSource::with_seed(1);
        let worker = SimulationWorker::new(&engine, &config, stake);

        let snapshot = player.snapshot().unwrap();
        let result = worker.play_sequence(&mut source, &mut player, &mut session);
        assert!(result.is_err());
        player.restore(&snapshot).unwrap();
        assert_eq!(player.private["plays"], 0);
    }

    #[test]
    fn test_branch_pick_is_recorded() {
        let engine = BranchyEngine;
        let config = SimConfig::default();
        let worker = SimulationWorker::new(&engine, &config, Stake::new(10.0));
        let template = one_mode_template();
        let mut source = LcgSource::with_seed(1627);

        let shard = worker.run_shard(1, &mut source, &template);
        assert_eq!(shard.bet_count, 1);
        // The branch draw is part of the spin's recorded history
        let recorded = source.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].bound, 2);
    }

    #[test]
    fn test_no_session_degrades_to_empty_shard() {
        let engine = NoSessionEngine;
        let config = SimConfig::default().with_variance();
        let worker = SimulationWorker::new(&engine, &config, Stake::new(10.0));
        let template = one_mode_template();
        let mut source = LcgSource::with_seed(1);

        let shard = worker.run_shard(25, &mut source, &template);
        assert_eq!(shard.assigned_spins, 25);
        assert_eq!(shard.bet_count, 0);
        assert_eq!(shard.total_bet, 0.0);
        assert!(shard.distribution.is_some());
    }

    #[test]
    fn test_variance_distribution_populated() {
        let engine = FixedWinEngine { win: 50.0 };
        let config = SimConfig::default().with_variance();
        let worker = SimulationWorker::new(&engine, &config, Stake::new(100.0));
        let template = one_mode_template();
        let mut source = LcgSource::with_seed(1627);

        let shard = worker.run_shard(20, &mut source, &template);
        let distribution = shard.distribution.unwrap();
        assert_eq!(distribution.total_weight(), 20);
        // Constant 0.5x return: zero spread
        assert_eq!(distribution.std_deviation(), 0.0);
        assert_eq!(distribution.max_return(), Some(0.5));
    }
}
