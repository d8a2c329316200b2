//! Download command implementation

use crate::downloader::config::{
    resolve_endpoint, DEFAULT_BLOCK_COUNT, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR,
    DEFAULT_RETRY_CONCURRENCY, DEFAULT_START_BLOCK, FAILED_PREVIEW_LIMIT, MAX_CONCURRENCY,
    RPC_TIMEOUT,
};
use crate::downloader::{RunReport, Scheduler};
use crate::range::BlockNumber;
use crate::rpc::HttpRpcClient;
use crate::store::RecordStore;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::{CliError, CompareArgs, VerifyArgs};

/// Parse and validate a worker count
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Block Archive Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "block-archive-downloader")]
#[command(about = "Download a contiguous range of blocks from an archive node", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a block range into the output directory
    Download(DownloadArgs),

    /// Check stored block files without contacting the node
    Verify(VerifyArgs),

    /// Compare two timing reports
    Compare(CompareArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Archive node JSON-RPC URL, or a preset name (`local`)
    #[arg(long, env = "BLOCK_RPC_URL")]
    pub rpc: String,

    /// First block of the range
    #[arg(long, default_value_t = DEFAULT_START_BLOCK)]
    pub start: BlockNumber,

    /// Number of blocks to download
    #[arg(long, default_value_t = DEFAULT_BLOCK_COUNT)]
    pub count: u64,

    /// Output directory; block files go to `<output>/blocks/`
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Concurrent fetches in the parallel pass (1-256)
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub workers: usize,

    /// Concurrent fetches in the retry pass
    #[arg(long, default_value_t = DEFAULT_RETRY_CONCURRENCY, value_parser = parse_concurrency)]
    pub retry_workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = RPC_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout_secs: u64,

    /// Skip the connectivity check before dispatching
    #[arg(long, default_value_t = false)]
    pub no_preflight: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl DownloadArgs {
    /// Execute the download
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let endpoint = resolve_endpoint(&self.rpc);
        if endpoint.is_empty() {
            return Err(CliError::InvalidArgument("RPC endpoint is empty".to_string()));
        }

        let client = Arc::new(HttpRpcClient::with_timeout(
            endpoint.clone(),
            Duration::from_secs(self.timeout_secs),
        )?);
        let store = Arc::new(RecordStore::open(&self.output)?);

        info!(
            endpoint = %endpoint,
            start = self.start,
            count = self.count,
            workers = self.workers,
            output = %self.output.display(),
            "Starting block download"
        );

        let progress = match cli.output_format {
            OutputFormat::Human => create_progress_bar(self.count),
            OutputFormat::Json => ProgressBar::hidden(),
        };

        let report = Scheduler::new(client, store)
            .with_preflight(!self.no_preflight)
            .with_retry_concurrency(self.retry_workers)
            .with_progress_bar(progress)
            .run(self.start, self.count, self.workers)
            .await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&endpoint, &self.output, &report),
            OutputFormat::Human => output_human(&endpoint, &self.output, &report),
        }

        if report.is_aborted() {
            return Err(CliError::PreflightFailed(
                report
                    .preflight
                    .as_ref()
                    .and_then(|p| p.error.clone())
                    .unwrap_or_else(|| "node not reachable".to_string()),
            ));
        }
        Ok(())
    }
}

/// Output the run report as one JSON document
fn output_json(endpoint: &str, output: &std::path::Path, report: &RunReport) {
    let output = serde_json::json!({
        "success": report.is_complete(),
        "endpoint": endpoint,
        "output_dir": output.display().to_string(),
        "failed_blocks": report.statistics.failed_blocks(),
        "average_transactions": report.statistics.average_transactions(),
        "report": report,
    });

    match serde_json::to_string(&output) {
        Ok(s) => println!("{s}"),
        Err(e) => error!("Failed to serialize run report: {}", e),
    }
}

/// Output the run report in human-readable form
fn output_human(endpoint: &str, output: &std::path::Path, report: &RunReport) {
    let stats = &report.statistics;

    if report.is_aborted() {
        eprintln!("\nDownload aborted: preflight against {endpoint} failed");
        if let Some(err) = report.preflight.as_ref().and_then(|p| p.error.as_deref()) {
            eprintln!("Error: {err}");
        }
        return;
    }

    println!("\nDownload finished");
    println!("Endpoint: {endpoint}");
    println!("Output: {}", output.display());
    println!(
        "Blocks: {}/{} stored ({} already present)",
        stats.succeeded, report.requested, stats.skipped
    );
    if report.first_pass_failures > 0 {
        println!(
            "Retried: {} ({} recovered)",
            report.first_pass_failures, report.recovered_on_retry
        );
    }
    println!("Failed: {}", stats.failed());
    println!("Transactions: {}", stats.total_transactions);
    println!(
        "Avg transactions/block: {:.1}",
        stats.average_transactions()
    );
    println!(
        "Elapsed: {:.1}s ({:.1} blocks/sec)",
        report.elapsed_secs, report.blocks_per_sec
    );

    let (preview, more) = report.failed_preview(FAILED_PREVIEW_LIMIT);
    if !preview.is_empty() {
        let blocks: Vec<String> = preview.iter().map(|f| f.block.to_string()).collect();
        println!("Failed blocks: {}", blocks.join(", "));
        if more > 0 {
            println!("  ... and {more} more");
        }
    }
}

/// Create progress bar with style
fn create_progress_bar(total_blocks: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_blocks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb
}
