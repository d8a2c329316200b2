//! Progress tracking for long-running block downloads.
//!
//! The scheduler feeds every completed outcome into a [`ProgressState`],
//! which decides when a `[PROGRESS]` log line is due (every percentage step
//! or after a quiet interval) and formats it with running success/failure
//! counts, average transactions per block, rate and remaining time.

use super::Outcome;
use std::time::{Duration, Instant};

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
const MIN_DOWNLOAD_DURATION: Duration = Duration::from_secs(30);

/// Controls update cadence of the progress states it creates.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    update_interval: Duration,
    min_percentage_step: f64,
}

impl ProgressTracker {
    /// Create a tracker with custom interval and percentage step.
    pub fn new(update_interval: Duration, min_percentage_step: f64) -> Self {
        Self {
            update_interval,
            min_percentage_step,
        }
    }

    /// Build a [`ProgressState`] for a pass over `total` blocks.
    pub fn create_state(&self, phase: &'static str, total: u64) -> ProgressState {
        let mut state = ProgressState::new(phase, total);
        state.update_interval = self.update_interval;
        state.min_percentage_step = self.min_percentage_step;
        state
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL, 10.0)
    }
}

/// Progress of one pass (dispatch or retry).
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Pass label ("download", "retry").
    pub phase: &'static str,
    /// Blocks completed in this pass.
    pub processed: u64,
    /// Blocks in this pass.
    pub total: u64,
    /// Successful completions.
    pub succeeded: u64,
    /// Failed completions.
    pub failed: u64,
    /// Transactions over successful completions.
    pub total_transactions: u64,
    /// When the pass started.
    pub start_time: Instant,
    /// Last time progress was reported.
    pub last_update: Instant,
    /// Minimum interval between time-based updates.
    pub update_interval: Duration,
    /// Last reported completion percentage.
    pub last_reported_percentage: f64,
    /// Minimum percentage delta required to emit a new update.
    pub min_percentage_step: f64,
}

impl ProgressState {
    /// Create a state with default cadence.
    pub fn new(phase: &'static str, total: u64) -> Self {
        let now = Instant::now();
        Self {
            phase,
            processed: 0,
            total,
            succeeded: 0,
            failed: 0,
            total_transactions: 0,
            start_time: now,
            last_update: now,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_reported_percentage: 0.0,
            min_percentage_step: 10.0,
        }
    }

    /// Account for one completed block.
    pub fn update(&mut self, outcome: &Outcome) {
        self.processed = self.processed.saturating_add(1);
        match outcome {
            Outcome::Success { tx_count, .. } => {
                self.succeeded += 1;
                self.total_transactions += tx_count;
            }
            Outcome::Failure { .. } => self.failed += 1,
        }
    }

    /// Completion percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed as f64 / self.total as f64) * 100.0
    }

    /// Blocks completed per second in this pass.
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Average transactions per successful block.
    pub fn average_transactions(&self) -> f64 {
        if self.succeeded == 0 {
            return 0.0;
        }
        self.total_transactions as f64 / self.succeeded as f64
    }

    /// Whether a progress line is due, by percentage step or elapsed time.
    pub fn should_emit_update(&self) -> bool {
        if self.processed == 0 {
            return false;
        }
        if self.percentage() - self.last_reported_percentage >= self.min_percentage_step {
            return true;
        }
        self.start_time.elapsed() >= MIN_DOWNLOAD_DURATION
            && self.last_update.elapsed() >= self.update_interval
    }

    /// Call after emitting a progress line.
    pub fn mark_emitted(&mut self) {
        self.last_update = Instant::now();
        self.last_reported_percentage = self.percentage();
    }

    /// Estimated time left in this pass.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let rate = self.rate();
        let remaining = self.total.saturating_sub(self.processed);
        if rate > 0.0 && remaining > 0 {
            Some(Duration::from_secs_f64(remaining as f64 / rate))
        } else {
            None
        }
    }

    /// Short postfix for progress bars: `success=.. failed=.. avg_txs=..`.
    pub fn format_postfix(&self) -> String {
        format!(
            "success={} failed={} avg_txs={:.1}",
            self.succeeded,
            self.failed,
            self.average_transactions()
        )
    }

    /// Human-readable progress line for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![
            format!("[PROGRESS] {}: {}/{} blocks", self.phase, self.processed, self.total),
            format!("- {:.1}% complete", self.percentage()),
            format!("({})", self.format_postfix()),
        ];

        let rate = self.rate();
        if rate > 0.0 {
            parts.push(format!("at {rate:.1} blocks/sec"));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

/// Compact duration formatting (`45s`, `12m`, `2.5h`).
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
