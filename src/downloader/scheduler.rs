//! Range scheduler: preflight, parallel dispatch, sequential retry
//!
//! Phases of one run:
//!
//! ```text
//! Idle -> Preflighting -> Dispatching -> Retrying -> Done
//!              \
//!               -> Aborted
//! ```
//!
//! Before the preflight the leading run of already stored blocks is read
//! once and counted as skipped. When that run covers the whole range the
//! preflight is skipped too, so a re-run over a complete store makes no
//! network calls at all.
//!
//! Every remaining block is dispatched exactly once in the parallel pass
//! and completions are integrated as they arrive, in any order. Blocks that
//! failed are then retried once, `retry_concurrency` at a time (1 by
//! default).

use super::config::{DEFAULT_RETRY_CONCURRENCY, FAILED_PREVIEW_LIMIT};
use super::preflight::{ConnectivityPreflight, PreflightReport};
use super::progress::{ProgressState, ProgressTracker};
use super::stats::{FailedBlock, RunStatistics, StatsAggregator};
use super::worker::FetchWorker;
use super::Outcome;
use crate::metrics;
use crate::range::{BlockNumber, BlockRange, RangeError};
use crate::rpc::JsonRpcClient;
use crate::store::{RecordStore, StoreError};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Lifecycle phase of a scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started
    Idle,
    /// Checking node connectivity
    Preflighting,
    /// Parallel pass over the range
    Dispatching,
    /// Sequential pass over failures
    Retrying,
    /// Finished; statistics are final
    Done,
    /// Preflight failed; nothing was dispatched
    Aborted,
}

/// Errors that make a run impossible to start
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Empty or overflowing range
    #[error("invalid block range: {0}")]
    InvalidRange(#[from] RangeError),

    /// Zero-width worker pool
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    /// Store could not be locked for this run
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Final report of a scheduler run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// `Done` or `Aborted`
    pub phase: RunPhase,
    /// First requested block
    pub start_block: BlockNumber,
    /// Number of requested blocks
    pub requested: u64,
    /// Width of the parallel pass
    pub concurrency: usize,
    /// Preflight findings, if a preflight ran
    pub preflight: Option<PreflightReport>,
    /// Counters after the retry pass
    pub statistics: RunStatistics,
    /// Failures left by the parallel pass, before retrying
    pub first_pass_failures: u64,
    /// Blocks that succeeded only on retry
    pub recovered_on_retry: u64,
    /// Wall-clock duration of the run
    pub elapsed_secs: f64,
    /// Stored blocks per second of wall-clock time
    pub blocks_per_sec: f64,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn aborted(
        range: BlockRange,
        concurrency: usize,
        preflight: PreflightReport,
        started: Instant,
    ) -> Self {
        Self {
            phase: RunPhase::Aborted,
            start_block: range.start(),
            requested: range.count(),
            concurrency,
            preflight: Some(preflight),
            statistics: RunStatistics::default(),
            first_pass_failures: 0,
            recovered_on_retry: 0,
            elapsed_secs: started.elapsed().as_secs_f64(),
            blocks_per_sec: 0.0,
            finished_at: Utc::now(),
        }
    }

    /// Whether the preflight stopped the run
    pub fn is_aborted(&self) -> bool {
        self.phase == RunPhase::Aborted
    }

    /// Whether every requested block is stored
    pub fn is_complete(&self) -> bool {
        self.phase == RunPhase::Done && self.statistics.succeeded == self.requested
    }

    /// First `limit` failures and how many more were left out
    pub fn failed_preview(&self, limit: usize) -> (&[FailedBlock], usize) {
        let failures = &self.statistics.failures;
        let shown = failures.len().min(limit);
        (&failures[..shown], failures.len() - shown)
    }
}

/// Coordinates preflight, parallel dispatch and retry over a block range
pub struct Scheduler {
    client: Arc<dyn JsonRpcClient>,
    worker: FetchWorker,
    preflight: bool,
    retry_concurrency: usize,
    progress_tracker: ProgressTracker,
    progress_bar: ProgressBar,
}

impl Scheduler {
    /// Create a scheduler with preflight enabled and a sequential retry pass
    pub fn new(client: Arc<dyn JsonRpcClient>, store: Arc<RecordStore>) -> Self {
        Self {
            worker: FetchWorker::new(client.clone(), store),
            client,
            preflight: true,
            retry_concurrency: DEFAULT_RETRY_CONCURRENCY,
            progress_tracker: ProgressTracker::default(),
            progress_bar: ProgressBar::hidden(),
        }
    }

    /// Enable or disable the connectivity preflight
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    /// Width of the retry pass (clamped to at least 1)
    pub fn with_retry_concurrency(mut self, retry_concurrency: usize) -> Self {
        self.retry_concurrency = retry_concurrency.max(1);
        self
    }

    /// Override progress log cadence
    pub fn with_progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = tracker;
        self
    }

    /// Drive a terminal progress bar during both passes
    pub fn with_progress_bar(mut self, progress_bar: ProgressBar) -> Self {
        self.progress_bar = progress_bar;
        self
    }

    /// Download `[start, start + count)` with `concurrency` fetches in flight
    ///
    /// # Errors
    ///
    /// Only configuration problems are errors: an empty or overflowing range,
    /// zero concurrency, or a store already locked by another run. A failed
    /// preflight returns `Ok` with [`RunPhase::Aborted`].
    pub async fn run(
        &self,
        start: BlockNumber,
        count: u64,
        concurrency: usize,
    ) -> Result<RunReport, SchedulerError> {
        let range = BlockRange::new(start, count)?;
        if concurrency == 0 {
            return Err(SchedulerError::InvalidConcurrency);
        }

        let span = tracing::info_span!(
            "download_range",
            start = range.start(),
            count = range.count(),
            concurrency = concurrency
        );
        self.run_range(range, concurrency).instrument(span).await
    }

    async fn run_range(
        &self,
        range: BlockRange,
        concurrency: usize,
    ) -> Result<RunReport, SchedulerError> {
        let started = Instant::now();
        let mut phase = RunPhase::Idle;
        debug!(phase = ?phase, range = %range, "Scheduler run requested");

        let _lock = self.worker.store().lock()?;
        let swept = self.worker.store().remove_stale_temp_files()?;
        if swept > 0 {
            info!(swept, "Removed temporary files left by an interrupted run");
        }

        let stored = self.scan_stored_prefix(range).await;
        let already_stored = stored.len();

        let mut preflight_report = None;
        if self.preflight && already_stored as u64 == range.count() {
            info!(range = %range, "Every block already stored, skipping preflight");
        } else if self.preflight {
            phase = RunPhase::Preflighting;
            debug!(phase = ?phase, "Entering phase");
            let report = ConnectivityPreflight::new(self.client.clone())
                .run(range.start())
                .await;
            if !report.passed() {
                error!(
                    error = report.error.as_deref().unwrap_or("unknown"),
                    "Preflight failed, aborting run"
                );
                self.progress_bar.finish_and_clear();
                let report = RunReport::aborted(range, concurrency, report, started);
                metrics::record_run(&report);
                return Ok(report);
            }
            preflight_report = Some(report);
        }

        let stats = StatsAggregator::new();

        phase = RunPhase::Dispatching;
        info!(
            phase = ?phase,
            first_block = range.start(),
            last_block = range.last(),
            already_stored,
            concurrency,
            "Starting parallel download"
        );
        let mut progress = self.progress_tracker.create_state("download", range.count());
        self.reset_progress_bar(range.count());
        for (block, tx_count) in range.iter().zip(stored) {
            let outcome = Outcome::Success {
                block,
                tx_count,
                skipped: true,
            };
            metrics::record_block_outcome(&outcome);
            self.complete(outcome, &stats, &mut progress);
        }
        self.drive(
            range.iter().skip(already_stored),
            concurrency,
            &stats,
            &mut progress,
        )
        .await;

        let failures = stats.take_failures();
        let first_pass_failures = failures.len() as u64;
        let mut recovered_on_retry = 0;

        if !failures.is_empty() {
            phase = RunPhase::Retrying;
            let preview: Vec<BlockNumber> = failures
                .iter()
                .take(FAILED_PREVIEW_LIMIT)
                .map(|f| f.block)
                .collect();
            warn!(
                phase = ?phase,
                failed = failures.len(),
                first_failed = ?preview,
                retry_concurrency = self.retry_concurrency,
                "Retrying failed blocks"
            );

            let mut progress = self
                .progress_tracker
                .create_state("retry", first_pass_failures);
            self.reset_progress_bar(first_pass_failures);
            recovered_on_retry = self
                .drive(
                    failures.iter().map(|f| f.block),
                    self.retry_concurrency,
                    &stats,
                    &mut progress,
                )
                .await;
            info!(recovered = recovered_on_retry, "Retry complete");
        }
        self.progress_bar.finish_and_clear();

        phase = RunPhase::Done;
        let statistics = stats.into_inner();
        let elapsed_secs = started.elapsed().as_secs_f64();
        let blocks_per_sec = if elapsed_secs > 0.0 {
            statistics.succeeded as f64 / elapsed_secs
        } else {
            0.0
        };

        info!(
            phase = ?phase,
            requested = range.count(),
            succeeded = statistics.succeeded,
            skipped = statistics.skipped,
            failed = statistics.failed(),
            total_transactions = statistics.total_transactions,
            elapsed_secs,
            blocks_per_sec,
            "Download run finished"
        );

        let report = RunReport {
            phase,
            start_block: range.start(),
            requested: range.count(),
            concurrency,
            preflight: preflight_report,
            statistics,
            first_pass_failures,
            recovered_on_retry,
            elapsed_secs,
            blocks_per_sec,
            finished_at: Utc::now(),
        };
        metrics::record_run(&report);
        Ok(report)
    }

    /// Run `blocks` through the worker pool, returning the number of successes
    async fn drive<I>(
        &self,
        blocks: I,
        width: usize,
        stats: &StatsAggregator,
        progress: &mut ProgressState,
    ) -> u64
    where
        I: IntoIterator<Item = BlockNumber>,
    {
        let mut completions = stream::iter(blocks)
            .map(|block| {
                let worker = self.worker.clone();
                async move { worker.fetch(block).await }
            })
            .buffer_unordered(width);

        let mut succeeded = 0;
        while let Some(outcome) = completions.next().await {
            if self.complete(outcome, stats, progress) {
                succeeded += 1;
            }
        }
        succeeded
    }

    /// Integrate one completion into stats and progress; true on success
    fn complete(
        &self,
        outcome: Outcome,
        stats: &StatsAggregator,
        progress: &mut ProgressState,
    ) -> bool {
        progress.update(&outcome);
        let success = outcome.is_success();
        stats.record(outcome);

        self.progress_bar.inc(1);
        self.progress_bar.set_message(progress.format_postfix());
        if progress.should_emit_update() {
            info!("{}", progress.format_progress());
            progress.mark_emitted();
        }
        success
    }

    /// Transaction counts of the blocks already stored at the start of `range`
    async fn scan_stored_prefix(&self, range: BlockRange) -> Vec<u64> {
        let store = self.worker.store().clone();
        match tokio::task::spawn_blocking(move || store.valid_prefix(range)).await {
            Ok(counts) => {
                debug!(stored = counts.len(), "Scanned stored blocks");
                counts
            }
            Err(e) => {
                warn!(error = %e, "Stored block scan failed, checking blocks during dispatch");
                Vec::new()
            }
        }
    }

    fn reset_progress_bar(&self, len: u64) {
        self.progress_bar.set_length(len);
        self.progress_bar.set_position(0);
    }
}
