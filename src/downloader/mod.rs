//! Parallel fetch-verify-persist-retry pipeline
//!
//! # Overview
//!
//! 1. **Preflight**: [`preflight::ConnectivityPreflight`] confirms the node
//!    answers and can serve the first block of the range
//! 2. **Dispatch**: [`scheduler::Scheduler`] runs one [`worker::FetchWorker`]
//!    invocation per block across a bounded pool
//! 3. **Persist**: each worker skips blocks already valid in the
//!    [`crate::store::RecordStore`], otherwise fetches and saves them
//! 4. **Retry**: failures from the parallel pass are retried once,
//!    sequentially
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use block_archive_downloader::downloader::Scheduler;
//! use block_archive_downloader::rpc::HttpRpcClient;
//! use block_archive_downloader::store::RecordStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpRpcClient::new("http://localhost:8545")?);
//! let store = Arc::new(RecordStore::open("./data_100k")?);
//!
//! let report = Scheduler::new(client, store)
//!     .run(18_000_000, 1_000, 20)
//!     .await?;
//! println!("{} blocks saved", report.statistics.succeeded);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-block failures are captured as [`FetchError`] inside an
//! [`Outcome::Failure`] and never abort the run. Only configuration errors
//! ([`SchedulerError`]) are returned as `Err`; a failed preflight yields a
//! report in the [`RunPhase::Aborted`] phase.

pub mod config;
pub mod outcome;
pub mod preflight;
pub mod progress;
pub mod scheduler;
pub mod stats;
pub mod worker;

pub use outcome::Outcome;
pub use preflight::{ConnectivityPreflight, PreflightReport};
pub use scheduler::{RunPhase, RunReport, Scheduler, SchedulerError};
pub use stats::{FailedBlock, RunStatistics, StatsAggregator};
pub use worker::FetchWorker;

use crate::range::BlockNumber;
use crate::rpc::RpcError;
use crate::store::StoreError;

/// Why fetching a single block failed
///
/// The scheduler retries every failed block once, whatever the variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network-level failure (connection, timeout, HTTP status, undecodable body)
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with an error payload
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node returned `null` for the block
    #[error("block {0} returned null")]
    NotFound(BlockNumber),

    /// The node answered with a block whose `number` is missing or different
    #[error("node returned an unusable body for block {block}: {reason}")]
    InvalidBlock {
        /// Requested block
        block: BlockNumber,
        /// Identity check failure
        reason: String,
    },

    /// Reading or writing the block file failed
    #[error("local IO error: {0}")]
    LocalIo(String),
}

impl FetchError {
    /// Short stable label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Rpc(_) => "rpc",
            FetchError::NotFound(_) => "not_found",
            FetchError::InvalidBlock { .. } => "invalid_block",
            FetchError::LocalIo(_) => "local_io",
        }
    }
}

impl From<RpcError> for FetchError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Remote(payload) => FetchError::Rpc(payload.to_string()),
            RpcError::Transport(msg) => FetchError::Transport(msg),
            RpcError::InvalidResponse(msg) => FetchError::Transport(msg),
        }
    }
}

impl From<StoreError> for FetchError {
    fn from(err: StoreError) -> Self {
        FetchError::LocalIo(err.to_string())
    }
}
