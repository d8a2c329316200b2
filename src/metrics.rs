//! Observability metrics for the block downloader
//!
//! ## Architecture
//!
//! - Uses the `metrics` crate facade; without an installed recorder every
//!   call is a cheap no-op, so library users and tests pay nothing
//! - Optional Prometheus exporter serving a scrape endpoint (`--metrics-addr`)
//! - Per-request correlation ids tie debug logs of one RPC call together

use crate::downloader::{Outcome, RunReport};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Global metrics initialization flag
static METRICS_INITIALIZED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Correlation ID counter for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter listening on `addr`
///
/// Idempotent: later calls are ignored once the exporter is installed.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.lock().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "rpc_requests_total",
        Unit::Count,
        "Total number of JSON-RPC requests sent to the archive node"
    );
    describe_histogram!(
        "rpc_request_duration_seconds",
        Unit::Seconds,
        "JSON-RPC request duration in seconds"
    );
    describe_counter!(
        "blocks_fetched_total",
        Unit::Count,
        "Blocks fetched from the node and saved"
    );
    describe_counter!(
        "blocks_skipped_total",
        Unit::Count,
        "Blocks already present and valid in the store"
    );
    describe_counter!(
        "blocks_failed_total",
        Unit::Count,
        "Failed block fetch attempts, by error kind"
    );
    describe_gauge!(
        "last_run_blocks_per_second",
        Unit::CountPerSecond,
        "Throughput of the most recent download run"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Whether the Prometheus exporter has been installed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.lock().await
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("rpc-{id:08x}")
}

/// Timing and status recording for one JSON-RPC request
pub struct RpcRequestMetrics {
    method: String,
    start_time: Instant,
    correlation_id: String,
}

impl RpcRequestMetrics {
    /// Start recording a request to `method`
    pub fn start(method: &str) -> Self {
        Self {
            method: method.to_string(),
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
        }
    }

    /// Record an HTTP response with `status_code`
    pub fn record_status(&self, status_code: u16) {
        self.record(status_code.to_string());

        if !(200..300).contains(&status_code) {
            warn!(
                correlation_id = %self.correlation_id,
                method = %self.method,
                status = status_code,
                "Non-success HTTP status from archive node"
            );
        }
    }

    /// Record a request that failed before any HTTP status was received
    pub fn record_transport_error(&self) {
        self.record("transport_error".to_string());
        debug!(
            correlation_id = %self.correlation_id,
            method = %self.method,
            duration_ms = self.start_time.elapsed().as_millis(),
            "Transport error recorded"
        );
    }

    /// Correlation ID of this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn record(&self, status: String) {
        let duration = self.start_time.elapsed();

        counter!(
            "rpc_requests_total",
            "method" => self.method.clone(),
            "status" => status,
        )
        .increment(1);

        histogram!(
            "rpc_request_duration_seconds",
            "method" => self.method.clone(),
        )
        .record(duration.as_secs_f64());
    }
}

/// Count one block outcome
pub fn record_block_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Success { skipped: true, .. } => counter!("blocks_skipped_total").increment(1),
        Outcome::Success { skipped: false, .. } => counter!("blocks_fetched_total").increment(1),
        Outcome::Failure { cause, .. } => {
            counter!("blocks_failed_total", "kind" => cause.kind()).increment(1)
        }
    }
}

/// Record the summary of a finished run
pub fn record_run(report: &RunReport) {
    gauge!("last_run_blocks_per_second").set(report.blocks_per_sec);
    debug!(
        phase = ?report.phase,
        succeeded = report.statistics.succeeded,
        failed = report.statistics.failed(),
        "Run metrics recorded"
    );
}
