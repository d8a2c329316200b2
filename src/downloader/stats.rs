//! Run statistics and their synchronized aggregator

use super::Outcome;
use crate::range::BlockNumber;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// A block that has not (yet) been stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBlock {
    /// Block number
    pub block: BlockNumber,
    /// Error kind label (see [`FetchError::kind`](super::FetchError::kind))
    pub kind: &'static str,
    /// Human-readable cause
    pub error: String,
}

/// Aggregate counters for one download run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    /// Blocks stored, including skipped ones
    pub succeeded: u64,
    /// Subset of `succeeded` that was already on disk
    pub skipped: u64,
    /// Sum of transaction counts over succeeded blocks
    pub total_transactions: u64,
    /// Blocks currently failed, in completion order
    pub failures: Vec<FailedBlock>,
}

impl RunStatistics {
    /// Number of failed blocks
    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    /// Blocks accounted for (successes plus failures)
    pub fn processed(&self) -> u64 {
        self.succeeded + self.failed()
    }

    /// Average transactions per succeeded block (0.0 when nothing succeeded)
    pub fn average_transactions(&self) -> f64 {
        if self.succeeded == 0 {
            return 0.0;
        }
        self.total_transactions as f64 / self.succeeded as f64
    }

    /// Failed block numbers in completion order
    pub fn failed_blocks(&self) -> Vec<BlockNumber> {
        self.failures.iter().map(|f| f.block).collect()
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success {
                tx_count, skipped, ..
            } => {
                self.succeeded += 1;
                self.total_transactions += tx_count;
                if skipped {
                    self.skipped += 1;
                }
            }
            Outcome::Failure { block, cause } => self.failures.push(FailedBlock {
                block,
                kind: cause.kind(),
                error: cause.to_string(),
            }),
        }
    }
}

/// Single mutation point for [`RunStatistics`] shared by concurrent completions
///
/// Each completion is integrated under one lock acquisition, so counters and
/// the failure list can never disagree.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<RunStatistics>,
}

impl StatsAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate one outcome
    pub fn record(&self, outcome: Outcome) {
        self.lock().record(outcome);
    }

    /// Remove and return every failure, leaving counters intact
    ///
    /// Used before a retry pass: every retried block records a fresh outcome.
    pub fn take_failures(&self) -> Vec<FailedBlock> {
        std::mem::take(&mut self.lock().failures)
    }

    /// Copy of the current statistics
    pub fn snapshot(&self) -> RunStatistics {
        self.lock().clone()
    }

    /// Consume the aggregator and return the final statistics
    pub fn into_inner(self) -> RunStatistics {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, RunStatistics> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
