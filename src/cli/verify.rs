//! Verify subcommand: offline scan of stored block files

use super::{CliError, OutputFormat};
use crate::downloader::config::{DEFAULT_OUTPUT_DIR, FAILED_PREVIEW_LIMIT};
use crate::range::{BlockNumber, BlockRange};
use crate::store::{RecordState, RecordStore};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Verify command arguments
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Output directory of a previous download
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// First block to check (defaults to every stored file)
    #[arg(long, requires = "count")]
    pub start: Option<BlockNumber>,

    /// Number of blocks to check from `--start`
    #[arg(long, requires = "start")]
    pub count: Option<u64>,
}

/// Result of scanning the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifySummary {
    /// Blocks with a valid record
    pub valid: u64,
    /// Blocks in the requested range without a file
    pub missing: Vec<BlockNumber>,
    /// Blocks whose file was rejected
    pub invalid: Vec<BlockNumber>,
    /// Transactions over valid records
    pub total_transactions: u64,
}

impl VerifySummary {
    /// Whether every checked block has a valid record
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    fn record(&mut self, block: BlockNumber, state: RecordState) {
        match state {
            RecordState::Valid { tx_count } => {
                self.valid += 1;
                self.total_transactions += tx_count;
            }
            RecordState::Missing => self.missing.push(block),
            RecordState::Invalid { reason } => {
                warn!(block, reason = %reason, "Invalid stored record");
                self.invalid.push(block);
            }
        }
    }
}

impl VerifyArgs {
    /// Execute the verify command
    pub async fn execute(&self, format: OutputFormat) -> Result<(), CliError> {
        let summary = self.scan()?;

        match format {
            OutputFormat::Json => match serde_json::to_string(&summary) {
                Ok(s) => println!("{s}"),
                Err(e) => warn!("Failed to serialize verify summary: {}", e),
            },
            OutputFormat::Human => print_summary(&summary),
        }

        if summary.is_clean() {
            Ok(())
        } else {
            Err(CliError::VerificationFailed {
                missing: summary.missing.len(),
                invalid: summary.invalid.len(),
            })
        }
    }

    /// Classify every block of the requested range, or every stored file
    pub fn scan(&self) -> Result<VerifySummary, CliError> {
        if !self.output.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "{} is not a directory",
                self.output.display()
            )));
        }
        let store = RecordStore::open(&self.output)?;

        let blocks: Vec<BlockNumber> = match (self.start, self.count) {
            (Some(start), Some(count)) => BlockRange::new(start, count)?.iter().collect(),
            _ => store.stored_blocks()?,
        };
        info!(
            blocks_dir = %store.blocks_dir().display(),
            checking = blocks.len(),
            "Verifying stored blocks"
        );

        let mut summary = VerifySummary::default();
        for block in blocks {
            summary.record(block, store.inspect(block));
        }
        Ok(summary)
    }
}

fn print_summary(summary: &VerifySummary) {
    println!("\nSummary:");
    println!("  Valid blocks: {}", summary.valid);
    println!("  Transactions: {}", summary.total_transactions);

    for (label, blocks) in [("Missing", &summary.missing), ("Invalid", &summary.invalid)] {
        if blocks.is_empty() {
            continue;
        }
        println!("  {label} blocks: {}", blocks.len());
        let shown: Vec<String> = blocks
            .iter()
            .take(FAILED_PREVIEW_LIMIT)
            .map(|b| b.to_string())
            .collect();
        println!("    {}", shown.join(", "));
        if blocks.len() > FAILED_PREVIEW_LIMIT {
            println!("    ... and {} more", blocks.len() - FAILED_PREVIEW_LIMIT);
        }
    }
}
