//! # Block Archive Downloader Library
//!
//! Downloads a contiguous range of blocks from an Ethereum-compatible archive
//! node over JSON-RPC and stores each one as its own JSON file, so interrupted
//! or partially failed runs can simply be started again.
//!
//! ## Features
//!
//! - **Resumable**: blocks already stored and structurally valid are never re-fetched
//! - **Parallel**: a bounded pool of concurrent fetches (20 by default)
//! - **Atomic Writes**: a block file is either complete or absent
//! - **Retry Pass**: blocks that failed in the parallel pass are retried once
//! - **Preflight**: two cheap calls confirm the node is usable before bulk work
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use block_archive_downloader::{HttpRpcClient, RecordStore, Scheduler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpRpcClient::new("http://localhost:8545")?);
//! let store = Arc::new(RecordStore::open("./data_100k")?);
//!
//! let report = Scheduler::new(client, store)
//!     .run(18_000_000, 100, 20)
//!     .await?;
//! println!(
//!     "{}/{} blocks, {:.1} tx/block",
//!     report.statistics.succeeded,
//!     report.requested,
//!     report.statistics.average_transactions()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`range`] - Block ranges and hex quantity encoding
//! - [`rpc`] - JSON-RPC 2.0 client trait and its HTTP implementation
//! - [`store`] - One-file-per-block record store with validation and atomic writes
//! - [`downloader`] - Preflight, worker pool, statistics and retry scheduling
//! - [`compare`] - Timing report comparison
//! - [`metrics`] - Prometheus metrics
//! - [`cli`] - Command line interface
//!
//! ## On-Disk Layout
//!
//! ```text
//! <output>/blocks/bdf-18000000.json   {"jsonrpc":"2.0","id":1,"result":{...}}
//! <output>/blocks/.download.lock      held while a download runs
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI command implementations
pub mod cli;

/// Timing report comparison
pub mod compare;

/// Download orchestration
pub mod downloader;

/// Metrics and observability
pub mod metrics;

/// Block ranges and quantity encoding
pub mod range;

/// JSON-RPC client
pub mod rpc;

/// Block record store
pub mod store;

pub use downloader::{FetchError, Outcome, RunReport, RunStatistics, Scheduler};
pub use range::{BlockNumber, BlockRange};
pub use rpc::{HttpRpcClient, JsonRpcClient, RpcError};
pub use store::{RecordStore, StoreError};
