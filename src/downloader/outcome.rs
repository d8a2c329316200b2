//! Result of one fetch attempt

use super::FetchError;
use crate::range::BlockNumber;

/// Tagged outcome of [`FetchWorker::fetch`](super::FetchWorker::fetch)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Block is on disk and valid
    Success {
        /// Block number
        block: BlockNumber,
        /// Number of transactions in the block
        tx_count: u64,
        /// Already stored before this attempt; no network call was made
        skipped: bool,
    },
    /// Block could not be fetched or stored
    Failure {
        /// Block number
        block: BlockNumber,
        /// What went wrong
        cause: FetchError,
    },
}

impl Outcome {
    /// Block this outcome is about
    pub fn block(&self) -> BlockNumber {
        match self {
            Outcome::Success { block, .. } | Outcome::Failure { block, .. } => *block,
        }
    }

    /// Whether the block ended up stored
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
