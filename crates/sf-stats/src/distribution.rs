//! Per-run histogram of normalized returns

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sf_rng::DrawRecord;

use crate::report::{DistributionReport, DistributionRow, RangeRow};

/// Returns are bucketed at hundredths precision
const BUCKET_SCALE: f64 = 100.0;

/// Named coarse value ranges for the report's second section,
/// as bet multiples: (label, inclusive upper bound)
const VALUE_RANGES: &[(&str, f64)] = &[
    ("0x", 0.0),
    ("(0, 1x]", 1.0),
    ("(1x, 5x]", 5.0),
    ("(5x, 20x]", 20.0),
    ("(20x, 100x]", 100.0),
    ("100x+", f64::INFINITY),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct Bucket {
    /// Occurrence weight
    weight: u64,
    /// Cumulative raw return
    total: f64,
}

/// Histogram of normalized per-spin returns.
///
/// Tracks the running maximum return together with the exact random draws
/// that produced it, so the best observed outcome can be replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnDistribution {
    tag: String,
    /// Keyed by the return scaled to integer hundredths
    buckets: BTreeMap<i64, Bucket>,
    max_return: Option<f64>,
    best_draws: Vec<DrawRecord>,
}

impl ReturnDistribution {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            buckets: BTreeMap::new(),
            max_return: None,
            best_draws: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Record one spin's normalized return together with the draws that
    /// produced it. Draws are retained only when a new maximum is observed.
    pub fn add_return(&mut self, normalized: f64, draws: &[DrawRecord]) {
        let key = (normalized * BUCKET_SCALE).round() as i64;
        let bucket = self.buckets.entry(key).or_default();
        bucket.weight += 1;
        bucket.total += normalized;

        if self.max_return.is_none_or(|max| normalized > max) {
            self.max_return = Some(normalized);
            self.best_draws = draws.to_vec();
        }
    }

    /// Weight-wise addition keyed by bucket value; the larger running
    /// maximum (and its draws) survives.
    pub fn merge(&mut self, other: &ReturnDistribution) {
        for (&key, other_bucket) in &other.buckets {
            let bucket = self.buckets.entry(key).or_default();
            bucket.weight += other_bucket.weight;
            bucket.total += other_bucket.total;
        }
        if let Some(other_max) = other.max_return {
            if self.max_return.is_none_or(|max| other_max > max) {
                self.max_return = Some(other_max);
                self.best_draws = other.best_draws.clone();
            }
        }
    }

    /// Total spins contributing to the distribution
    pub fn total_weight(&self) -> u64 {
        self.buckets.values().map(|b| b.weight).sum()
    }

    pub fn max_return(&self) -> Option<f64> {
        self.max_return
    }

    /// The recorded draw sequence behind the best observed outcome
    pub fn best_draws(&self) -> &[DrawRecord] {
        &self.best_draws
    }

    /// Weighted mean over bucketed values
    pub fn mean(&self) -> f64 {
        let weight = self.total_weight();
        if weight == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .buckets
            .iter()
            .map(|(&key, bucket)| (key as f64 / BUCKET_SCALE) * bucket.weight as f64)
            .sum();
        sum / weight as f64
    }

    /// Population variance over bucketed values weighted by occurrence
    pub fn variance(&self) -> f64 {
        let weight = self.total_weight();
        if weight == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let sum: f64 = self
            .buckets
            .iter()
            .map(|(&key, bucket)| {
                let value = key as f64 / BUCKET_SCALE;
                (value - mean).powi(2) * bucket.weight as f64
            })
            .sum();
        sum / weight as f64
    }

    /// Population standard deviation
    pub fn std_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Report sorted by ascending return, plus the coarse named ranges
    pub fn report(&self) -> DistributionReport {
        let total_weight = self.total_weight();
        let rows = self
            .buckets
            .iter()
            .map(|(&key, bucket)| DistributionRow {
                return_value: key as f64 / BUCKET_SCALE,
                occurrences: bucket.weight,
                share: if total_weight > 0 {
                    bucket.weight as f64 / total_weight as f64
                } else {
                    0.0
                },
                cumulative_total: bucket.total,
            })
            .collect();

        let mut ranges: Vec<RangeRow> = VALUE_RANGES
            .iter()
            .map(|&(label, _)| RangeRow {
                label: label.into(),
                occurrences: 0,
                share: 0.0,
                cumulative_total: 0.0,
            })
            .collect();
        for (&key, bucket) in &self.buckets {
            let value = key as f64 / BUCKET_SCALE;
            let index = VALUE_RANGES
                .iter()
                .position(|&(_, upper)| value <= upper)
                .unwrap_or(VALUE_RANGES.len() - 1);
            ranges[index].occurrences += bucket.weight;
            ranges[index].cumulative_total += bucket.total;
        }
        if total_weight > 0 {
            for range in &mut ranges {
                range.share = range.occurrences as f64 / total_weight as f64;
            }
        }

        DistributionReport {
            tag: self.tag.clone(),
            total_spins: total_weight,
            std_deviation: self.std_deviation(),
            max_return: self.max_return.unwrap_or(0.0),
            rows,
            ranges,
        }
    }
}
