//! CLI error types and conversions

use crate::compare::CompareError;
use crate::downloader::SchedulerError;
use crate::range::RangeError;
use crate::rpc::RpcError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Range error
    #[error("range error: {0}")]
    RangeError(#[from] RangeError),

    /// RPC client error
    #[error("rpc error: {0}")]
    RpcError(#[from] RpcError),

    /// Store error
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Scheduler error
    #[error("download error: {0}")]
    SchedulerError(#[from] SchedulerError),

    /// Comparison error
    #[error("compare error: {0}")]
    CompareError(#[from] CompareError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Connectivity preflight failed; nothing was downloaded
    #[error("preflight failed: {0}")]
    PreflightFailed(String),

    /// Stored records are missing or invalid
    #[error("verification failed: {missing} missing, {invalid} invalid")]
    VerificationFailed {
        /// Missing block count
        missing: usize,
        /// Invalid block count
        invalid: usize,
    },

    /// Candidate did not improve enough on the baseline
    #[error("improvement {improvement:.1}% is below the {threshold:.1}% threshold")]
    BelowThreshold {
        /// Measured improvement in percent
        improvement: f64,
        /// Required improvement in percent
        threshold: f64,
    },
}
