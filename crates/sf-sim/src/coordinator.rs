//! Shard scheduling, merge fan-in and progress reporting

use std::thread;
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use sf_engine::{GameEngine, Stake};
use sf_rng::SourcePool;
use sf_stats::{ReturnDistribution, StatisticsTree};

use crate::config::{SimConfig, SINGLE_WORKER_THRESHOLD};
use crate::error::{SimError, SimResult};
use crate::worker::{ShardResult, SimulationWorker};

/// Snapshot handed to the progress callback after each shard merge.
///
/// Callbacks run on the coordinator's sequential path, in merge order,
/// never concurrently with each other.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub total_spins: u64,
    pub completed_spins: u64,
    pub elapsed_ms: u64,
    pub bet_count: u64,
    pub total_bet: f64,
    pub total_win: f64,
}

/// Final aggregated results of a run.
///
/// A completed run always yields an aggregate, even if shards degraded to
/// empty; compare `bet_count` against `requested_spins` to detect partial
/// degradation.
#[derive(Debug)]
pub struct AggregatedResult {
    pub requested_spins: u64,
    pub bet_count: u64,
    pub total_bet: f64,
    pub total_win: f64,
    /// Fully merged tree with RTP computed at every node
    pub stats: StatisticsTree,
    pub distribution: Option<ReturnDistribution>,
    pub std_deviation: Option<f64>,
}

impl AggregatedResult {
    /// Overall return-to-player ratio
    pub fn rtp(&self) -> f64 {
        if self.total_bet > 0.0 {
            self.total_win / self.total_bet
        } else {
            0.0
        }
    }
}

/// Running aggregate maintained across shard merges
struct Aggregate {
    stats: StatisticsTree,
    distribution: Option<ReturnDistribution>,
    bet_count: u64,
    total_bet: f64,
    total_win: f64,
    completed_spins: u64,
}

impl Aggregate {
    fn new(template: &StatisticsTree, variance: bool) -> Self {
        Self {
            stats: template.clone(),
            distribution: variance.then(|| ReturnDistribution::new("run")),
            bet_count: 0,
            total_bet: 0.0,
            total_win: 0.0,
            completed_spins: 0,
        }
    }

    fn merge_shard(&mut self, shard: ShardResult) -> SimResult<()> {
        self.stats.merge(&shard.stats)?;
        if let (Some(aggregate), Some(contribution)) =
            (&mut self.distribution, &shard.distribution)
        {
            aggregate.merge(contribution);
        }
        self.bet_count += shard.bet_count;
        self.total_bet += shard.total_bet;
        self.total_win += shard.total_win;
        self.completed_spins += shard.assigned_spins;
        Ok(())
    }

    fn progress(&self, total_spins: u64, started: Instant) -> Progress {
        Progress {
            total_spins,
            completed_spins: self.completed_spins,
            elapsed_ms: started.elapsed().as_millis() as u64,
            bet_count: self.bet_count,
            total_bet: self.total_bet,
            total_win: self.total_win,
        }
    }
}

/// Schedules shards across a fixed pool of concurrent workers, merges
/// completed shards in completion order and reports progress.
pub struct SimulationCoordinator<'a, E: GameEngine> {
    engine: &'a E,
    pool: &'a SourcePool,
    template: StatisticsTree,
    config: SimConfig,
}

impl<'a, E: GameEngine> SimulationCoordinator<'a, E> {
    pub fn new(
        engine: &'a E,
        pool: &'a SourcePool,
        template: StatisticsTree,
        config: SimConfig,
    ) -> Self {
        Self {
            engine,
            pool,
            template,
            config,
        }
    }

    /// Worker count used when the caller passes 0 ("auto")
    pub fn default_worker_count() -> usize {
        num_cpus::get()
    }

    /// Run `total_spins` spins across up to `worker_count` concurrent
    /// workers and return the merged aggregate.
    ///
    /// Small runs bypass sharding and execute synchronously. The progress
    /// callback fires after every shard merge.
    pub fn run(
        &self,
        total_spins: u64,
        worker_count: usize,
        stake: Stake,
        mut progress: Option<&mut dyn FnMut(&Progress)>,
    ) -> SimResult<AggregatedResult> {
        self.engine.check_stake(&stake)?;

        let started = Instant::now();
        let variance = self.config.variance_tracking;
        let mut aggregate = Aggregate::new(&self.template, variance);
        let worker = SimulationWorker::new(self.engine, &self.config, stake);

        if total_spins == 0 {
            return Ok(self.finalize(total_spins, aggregate));
        }

        if total_spins < SINGLE_WORKER_THRESHOLD {
            debug!("small run ({total_spins} spins): single synchronous worker");
            let mut source = self.pool.acquire();
            let shard = worker.run_shard(total_spins, &mut *source, &self.template);
            self.pool.release(source);
            aggregate.merge_shard(shard)?;
            if let Some(callback) = progress.as_mut() {
                callback(&aggregate.progress(total_spins, started));
            }
            return Ok(self.finalize(total_spins, aggregate));
        }

        let shard_count = self.config.effective_shard_count(total_spins);
        let sizes = shard_sizes(total_spins, shard_count);
        let worker_count = if worker_count == 0 {
            Self::default_worker_count()
        } else {
            worker_count
        };
        info!(
            "simulating {total_spins} spins: {shard_count} shards across {worker_count} workers"
        );

        thread::scope(|scope| -> SimResult<()> {
            let (tx, rx) = crossbeam_channel::bounded::<ShardResult>(0);
            let pool = self.pool;
            let template = &self.template;
            let worker = &worker;

            let spawn_shard = |spins: u64| {
                let tx = tx.clone();
                scope.spawn(move || {
                    let mut source = pool.acquire();
                    let shard = worker.run_shard(spins, &mut *source, template);
                    pool.release(source);
                    // An abandoned coordinator simply drops the result
                    let _ = tx.send(shard);
                });
            };

            let mut next = 0usize;
            while next < sizes.len() && next < worker_count {
                spawn_shard(sizes[next]);
                next += 1;
            }

            // Merges happen strictly one at a time, in completion order;
            // the aggregate is order-independent because merge commutes.
            for _ in 0..sizes.len() {
                let shard = rx.recv().map_err(|_| SimError::WorkerLost)?;
                aggregate.merge_shard(shard)?;
                if let Some(callback) = progress.as_mut() {
                    callback(&aggregate.progress(total_spins, started));
                }
                if next < sizes.len() {
                    spawn_shard(sizes[next]);
                    next += 1;
                }
            }
            Ok(())
        })?;

        Ok(self.finalize(total_spins, aggregate))
    }

    fn finalize(&self, requested_spins: u64, mut aggregate: Aggregate) -> AggregatedResult {
        aggregate.stats.calc_rtp(aggregate.total_bet);
        let std_deviation = aggregate
            .distribution
            .as_ref()
            .map(ReturnDistribution::std_deviation);
        AggregatedResult {
            requested_spins,
            bet_count: aggregate.bet_count,
            total_bet: aggregate.total_bet,
            total_win: aggregate.total_win,
            stats: aggregate.stats,
            distribution: aggregate.distribution,
            std_deviation,
        }
    }
}

/// Split `total` into `count` shards, remainder spread over the first ones
fn shard_sizes(total: u64, count: u64) -> Vec<u64> {
    let base = total / count;
    let remainder = total % count;
    (0..count)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}
