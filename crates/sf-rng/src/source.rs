//! Random sources with draw recording, tag/rollback and replay caches

use std::collections::VecDeque;

use rand::rngs::{SmallRng, StdRng};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{RngError, RngResult};

/// One recorded draw: the raw entropy consumed, the requested exclusive
/// bound, and the value handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// Raw value before bounding (or the injected cache value)
    pub raw: i64,
    /// Requested exclusive bound
    pub bound: i64,
    /// Resulting value in `[0, bound)`
    pub value: i64,
}

/// Capability interface shared by all source variants.
///
/// Draws are appended to the recorded sequence in order; replaying the
/// recorded values as the cache of a fresh instance reproduces the same
/// value sequence given the same bounds.
pub trait RandomSource: Send {
    /// Draw a value in `[0, bound_exclusive)`.
    ///
    /// If the injected cache is non-empty its front value is consumed
    /// (mod bound) instead of fresh entropy. Fails only if
    /// `bound_exclusive <= 0`.
    fn draw(&mut self, bound_exclusive: i64) -> RngResult<i64>;

    /// Ordered sequence of every draw since the last clear/rollback
    fn recorded(&self) -> &[DrawRecord];

    /// Reset the recorded sequence and rollback tag (between logical spins)
    fn clear_recorded(&mut self);

    /// Store the current recorded length as the rollback point
    fn tag(&mut self);

    /// Truncate the recorded sequence back to the tagged length.
    ///
    /// Fails with [`RngError::InvalidTag`] if no tag was set or the tag
    /// point is out of range. The tag is consumed.
    fn rollback(&mut self) -> RngResult<()>;

    /// Replace the injected-value queue consumed before fresh entropy
    fn set_cache(&mut self, values: Vec<i64>);

    /// Empty the injected-value queue
    fn clear_cache(&mut self);

    /// Convenience: the recorded values only, in draw order
    fn recorded_values(&self) -> Vec<i64> {
        self.recorded().iter().map(|r| r.value).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENTROPY BACKENDS
// ═══════════════════════════════════════════════════════════════════════════

/// Raw entropy production behind a [`RecordedSource`].
///
/// Implementations return non-negative values; bounding is applied by the
/// recording wrapper.
pub trait Entropy: Send {
    fn next_raw(&mut self) -> i64;
}

/// General-purpose backend (cryptographically strong StdRng)
pub struct StdEntropy(StdRng);

impl StdEntropy {
    pub fn new() -> Self {
        Self(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for StdEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl Entropy for StdEntropy {
    fn next_raw(&mut self) -> i64 {
        (self.0.next_u64() >> 1) as i64
    }
}

/// High-throughput backend for sustained simulation load
pub struct FastEntropy(SmallRng);

impl FastEntropy {
    pub fn new() -> Self {
        Self(SmallRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

impl Default for FastEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl Entropy for FastEntropy {
    fn next_raw(&mut self) -> i64 {
        (self.0.next_u64() >> 1) as i64
    }
}

/// Linear-congruential backend for fully deterministic golden-file runs.
///
/// state' = (state * 51654324 + 165403) mod 2147483647
pub struct Lcg {
    state: i64,
}

/// LCG modulus (2^31 - 1)
pub const LCG_MODULUS: i64 = 2_147_483_647;
/// LCG multiplier
pub const LCG_MULTIPLIER: i64 = 51_654_324;
/// LCG increment
pub const LCG_INCREMENT: i64 = 165_403;

impl Lcg {
    pub fn new(seed: i64) -> Self {
        Self {
            state: seed.rem_euclid(LCG_MODULUS),
        }
    }
}

impl Entropy for Lcg {
    fn next_raw(&mut self) -> i64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RECORDING WRAPPER
// ═══════════════════════════════════════════════════════════════════════════

/// Recording wrapper around an entropy backend.
///
/// Owns the recorded-draw sequence, the optional rollback tag and the
/// injected-value cache; the backend only produces raw values.
pub struct RecordedSource<E: Entropy> {
    entropy: E,
    recorded: Vec<DrawRecord>,
    tag: Option<usize>,
    cache: VecDeque<i64>,
}

impl<E: Entropy> RecordedSource<E> {
    pub fn with_entropy(entropy: E) -> Self {
        Self {
            entropy,
            recorded: Vec::new(),
            tag: None,
            cache: VecDeque::new(),
        }
    }

    /// Remaining injected values not yet consumed
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl<E: Entropy> RandomSource for RecordedSource<E> {
    fn draw(&mut self, bound_exclusive: i64) -> RngResult<i64> {
        if bound_exclusive <= 0 {
            return Err(RngError::InvalidBound(bound_exclusive));
        }

        let raw = match self.cache.pop_front() {
            Some(injected) => injected,
            None => self.entropy.next_raw(),
        };
        // rem_euclid keeps arbitrary injected values in range
        let value = raw.rem_euclid(bound_exclusive);

        self.recorded.push(DrawRecord {
            raw,
            bound: bound_exclusive,
            value,
        });
        Ok(value)
    }

    fn recorded(&self) -> &[DrawRecord] {
        &self.recorded
    }

    fn clear_recorded(&mut self) {
        self.recorded.clear();
        self.tag = None;
    }

    fn tag(&mut self) {
        self.tag = Some(self.recorded.len());
    }

    fn rollback(&mut self) -> RngResult<()> {
        let mark = self.tag.take().ok_or(RngError::InvalidTag)?;
        if mark > self.recorded.len() {
            return Err(RngError::InvalidTag);
        }
        self.recorded.truncate(mark);
        Ok(())
    }

    fn set_cache(&mut self, values: Vec<i64>) {
        self.cache = values.into();
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Default general-purpose source
pub type StdSource = RecordedSource<StdEntropy>;

impl StdSource {
    pub fn new() -> Self {
        Self::with_entropy(StdEntropy::new())
    }

    /// Seeded for reproducible results
    pub fn seeded(seed: u64) -> Self {
        Self::with_entropy(StdEntropy::seeded(seed))
    }
}

impl Default for StdSource {
    fn default() -> Self {
        Self::new()
    }
}

/// High-throughput source for bulk simulation
pub type FastSource = RecordedSource<FastEntropy>;

impl FastSource {
    pub fn new() -> Self {
        Self::with_entropy(FastEntropy::new())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_entropy(FastEntropy::seeded(seed))
    }
}

impl Default for FastSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Fully deterministic linear-congruential source
pub type LcgSource = RecordedSource<Lcg>;

impl LcgSource {
    pub fn with_seed(seed: i64) -> Self {
        Self::with_entropy(Lcg::new(seed))
    }
}
