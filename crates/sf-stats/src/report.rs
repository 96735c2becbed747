//! Tabular report model and CSV export
//!
//! Spreadsheet styling is out of scope; this module only produces the
//! tabular data those renderers consume. Export I/O failures surface to
//! the caller — the in-memory results are never lost.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StatsResult;

/// One statistics-tree node, keyed by its path
/// (`mode / tag / symbol / count`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRow {
    pub path: String,
    pub triggers: u64,
    pub total_win: f64,
    pub rtp: f64,
    pub hit_rate: f64,
}

/// One return bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    pub return_value: f64,
    pub occurrences: u64,
    pub share: f64,
    pub cumulative_total: f64,
}

/// One coarse named value range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRow {
    pub label: String,
    pub occurrences: u64,
    pub share: f64,
    pub cumulative_total: f64,
}

/// Full return-distribution report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub tag: String,
    pub total_spins: u64,
    pub std_deviation: f64,
    pub max_return: f64,
    /// Sorted by ascending return value
    pub rows: Vec<DistributionRow>,
    /// Coarse re-bucketing into named value ranges
    pub ranges: Vec<RangeRow>,
}

/// Write tree rows as CSV
pub fn write_tree_csv<W: Write>(writer: W, rows: &[TreeRow]) -> StatsResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a tree report to a file
pub fn write_tree_report(path: &Path, rows: &[TreeRow]) -> StatsResult<()> {
    let file = File::create(path)?;
    write_tree_csv(file, rows)
}

/// Write the two distribution sections as CSV: the per-bucket rows
/// followed by a blank line and the named value ranges
pub fn write_distribution_csv<W: Write>(
    mut writer: W,
    report: &DistributionReport,
) -> StatsResult<()> {
    {
        let mut csv_writer = csv::Writer::from_writer(&mut writer);
        for row in &report.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
    }
    writeln!(writer)?;
    let mut csv_writer = csv::Writer::from_writer(&mut writer);
    for range in &report.ranges {
        csv_writer.serialize(range)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a distribution report to a file
pub fn write_distribution_report(path: &Path, report: &DistributionReport) -> StatsResult<()> {
    let file = File::create(path)?;
    write_distribution_csv(file, report)
}
