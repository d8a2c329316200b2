//! Fetch-verify-persist for a single block

use super::{FetchError, Outcome};
use crate::metrics;
use crate::range::BlockNumber;
use crate::rpc::{self, JsonRpcClient};
use crate::store::{RecordState, RecordStore, StoredRecord};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, trace};

/// Downloads one block at a time into the record store
///
/// Cheap to share: holds only `Arc`s to the client and the store.
#[derive(Clone)]
pub struct FetchWorker {
    client: Arc<dyn JsonRpcClient>,
    store: Arc<RecordStore>,
}

impl FetchWorker {
    /// Create a worker over a client and a store
    pub fn new(client: Arc<dyn JsonRpcClient>, store: Arc<RecordStore>) -> Self {
        Self { client, store }
    }

    /// Store the worker writes to
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Make sure `block` is stored, reporting what happened
    ///
    /// Never fails: transport, RPC, missing-block and disk errors all become
    /// [`Outcome::Failure`] so sibling fetches keep running.
    pub async fn fetch(&self, block: BlockNumber) -> Outcome {
        let outcome = match self.try_fetch(block).await {
            Ok((tx_count, skipped)) => Outcome::Success {
                block,
                tx_count,
                skipped,
            },
            Err(cause) => {
                debug!(block, kind = cause.kind(), error = %cause, "Block fetch failed");
                Outcome::Failure { block, cause }
            }
        };
        metrics::record_block_outcome(&outcome);
        outcome
    }

    async fn try_fetch(&self, block: BlockNumber) -> Result<(u64, bool), FetchError> {
        let store = self.store.clone();
        let state = tokio::task::spawn_blocking(move || store.inspect(block))
            .await
            .map_err(storage_task_failed)?;

        match state {
            RecordState::Valid { tx_count } => {
                trace!(block, tx_count, "Block already stored, skipping");
                return Ok((tx_count, true));
            }
            RecordState::Invalid { reason } => {
                debug!(block, reason = %reason, "Stored block invalid, re-fetching");
            }
            RecordState::Missing => {}
        }

        let raw = rpc::block_by_number(self.client.as_ref(), block, true)
            .await?
            .ok_or(FetchError::NotFound(block))?;

        // Only bodies the store accepts on re-read are persisted
        let record = StoredRecord::wrap(raw);
        record
            .validate_identity(block)
            .map_err(|reason| FetchError::InvalidBlock { block, reason })?;
        let tx_count = record.tx_count();

        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save_record(block, &record))
            .await
            .map_err(storage_task_failed)??;
        trace!(block, tx_count, "Block saved");

        Ok((tx_count, false))
    }
}

fn storage_task_failed(err: JoinError) -> FetchError {
    FetchError::LocalIo(format!("storage task failed: {err}"))
}
