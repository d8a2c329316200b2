//! Compare subcommand

use super::{CliError, OutputFormat};
use crate::compare::{
    Comparison, TimingReport, DEFAULT_BASELINE_COLUMN, DEFAULT_CANDIDATE_COLUMN,
    DEFAULT_IMPROVEMENT_THRESHOLD,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Compare command arguments
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// Baseline timing report
    #[arg(long)]
    pub baseline: PathBuf,

    /// Candidate timing report
    #[arg(long)]
    pub candidate: PathBuf,

    /// Required improvement in percent
    #[arg(long, default_value_t = DEFAULT_IMPROVEMENT_THRESHOLD)]
    pub threshold: f64,

    /// Zero-based timing column of the baseline report
    #[arg(long, default_value_t = DEFAULT_BASELINE_COLUMN)]
    pub baseline_column: usize,

    /// Zero-based timing column of the candidate report
    #[arg(long, default_value_t = DEFAULT_CANDIDATE_COLUMN)]
    pub candidate_column: usize,
}

impl CompareArgs {
    /// Execute the comparison; fails when the threshold is not met
    pub async fn execute(&self, format: OutputFormat) -> Result<(), CliError> {
        let baseline = TimingReport::load(&self.baseline, self.baseline_column)?;
        let candidate = TimingReport::load(&self.candidate, self.candidate_column)?;
        info!(
            baseline_blocks = baseline.blocks,
            candidate_blocks = candidate.blocks,
            "Loaded timing reports"
        );

        let comparison = Comparison::new(baseline, candidate)?;
        let passed = comparison.meets_threshold(self.threshold);

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "success": passed,
                    "threshold": self.threshold,
                    "comparison": comparison,
                });
                println!("{output}");
            }
            OutputFormat::Human => self.print_human(&comparison, passed),
        }

        if passed {
            Ok(())
        } else {
            Err(CliError::BelowThreshold {
                improvement: comparison.improvement_pct,
                threshold: self.threshold,
            })
        }
    }

    fn print_human(&self, cmp: &Comparison, passed: bool) {
        println!("\nBaseline ({}):", self.baseline.display());
        println!("  Blocks:      {}", cmp.baseline.blocks);
        println!(
            "  Total time:  {:.2}ms ({:.2}s)",
            cmp.baseline.total_ms,
            cmp.baseline.total_ms / 1000.0
        );
        println!("Candidate ({}):", self.candidate.display());
        println!("  Blocks:      {}", cmp.candidate.blocks);
        println!(
            "  Total time:  {:.2}ms ({:.2}s)",
            cmp.candidate.total_ms,
            cmp.candidate.total_ms / 1000.0
        );
        println!("Comparison:");
        println!("  Improvement: {:.1}%", cmp.improvement_pct);
        println!("  Speedup:     {:.2}x", cmp.speedup);
        println!("  Time saved:  {:.2}ms", cmp.time_saved_ms);

        if passed {
            println!(
                "\nPASS: {:.1} points above the {:.1}% threshold",
                cmp.improvement_pct - self.threshold,
                self.threshold
            );
        } else {
            println!(
                "\nFAIL: {:.1}% short of the {:.1}% threshold",
                self.threshold - cmp.improvement_pct,
                self.threshold
            );
        }
    }
}
