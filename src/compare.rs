//! Timing report comparison
//!
//! Reads two whitespace-separated tabular reports (one row per block, one
//! header line), sums a timing column from each and decides whether the
//! candidate beats the baseline by at least a required percentage.
//!
//! ```text
//! block      txs   gas        time
//! 18000000   152   14985211   41.2ms
//! 18000001   98    9876543    850µs
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Minimum improvement, in percent, a candidate must show
pub const DEFAULT_IMPROVEMENT_THRESHOLD: f64 = 15.0;

/// Timing column of baseline reports
pub const DEFAULT_BASELINE_COLUMN: usize = 4;

/// Timing column of candidate reports
pub const DEFAULT_CANDIDATE_COLUMN: usize = 3;

/// Comparison errors
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// Report file could not be read
    #[error("cannot read report {path}: {reason}")]
    Io {
        /// Report path
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// A timing cell is not a number with an optional unit
    #[error("invalid timing value '{value}' on line {line}")]
    InvalidTiming {
        /// Offending cell
        value: String,
        /// 1-based line number in the report
        line: usize,
    },

    /// Baseline total is zero, so no improvement can be computed
    #[error("baseline report has no timing data")]
    EmptyBaseline,
}

/// Parse a timing cell into milliseconds
///
/// Accepts `ms`, `µs`/`us` and `ns` suffixes; a bare number is milliseconds.
pub fn parse_duration_ms(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let (number, divisor) = if let Some(v) = cell.strip_suffix("ns") {
        (v, 1_000_000.0)
    } else if let Some(v) = cell.strip_suffix("µs").or_else(|| cell.strip_suffix("us")) {
        (v, 1_000.0)
    } else if let Some(v) = cell.strip_suffix("ms") {
        (v, 1.0)
    } else {
        (cell, 1.0)
    };

    let value: f64 = number.trim().parse().ok()?;
    value.is_finite().then_some(value / divisor)
}

/// Summed timings of one report
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingReport {
    /// Rows that carried a timing cell
    pub blocks: u64,
    /// Sum of the timing column, in milliseconds
    pub total_ms: f64,
}

impl TimingReport {
    /// Sum `column` over the rows of `contents`
    ///
    /// The first line is a header. Blank lines and rows with too few columns
    /// are ignored.
    pub fn parse(contents: &str, column: usize) -> Result<Self, CompareError> {
        let mut report = TimingReport {
            blocks: 0,
            total_ms: 0.0,
        };

        for (idx, line) in contents.lines().enumerate().skip(1) {
            let Some(cell) = line.split_whitespace().nth(column) else {
                continue;
            };
            let ms = parse_duration_ms(cell).ok_or_else(|| CompareError::InvalidTiming {
                value: cell.to_string(),
                line: idx + 1,
            })?;
            report.total_ms += ms;
            report.blocks += 1;
        }

        Ok(report)
    }

    /// Read and sum the report at `path`
    pub fn load(path: &Path, column: usize) -> Result<Self, CompareError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CompareError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&contents, column)
    }
}

/// Baseline versus candidate verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    /// Baseline totals
    pub baseline: TimingReport,
    /// Candidate totals
    pub candidate: TimingReport,
    /// `(baseline - candidate) / baseline * 100`
    pub improvement_pct: f64,
    /// `baseline / candidate`, or 0 when the candidate total is 0
    pub speedup: f64,
    /// `baseline - candidate`, in milliseconds
    pub time_saved_ms: f64,
}

impl Comparison {
    /// Compare two summed reports
    pub fn new(baseline: TimingReport, candidate: TimingReport) -> Result<Self, CompareError> {
        if baseline.total_ms <= 0.0 {
            return Err(CompareError::EmptyBaseline);
        }

        let time_saved_ms = baseline.total_ms - candidate.total_ms;
        let speedup = if candidate.total_ms > 0.0 {
            baseline.total_ms / candidate.total_ms
        } else {
            0.0
        };

        Ok(Self {
            baseline,
            candidate,
            improvement_pct: time_saved_ms / baseline.total_ms * 100.0,
            speedup,
            time_saved_ms,
        })
    }

    /// Whether the improvement reaches `threshold` percent
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.improvement_pct >= threshold
    }
}
