//! File-per-block record store
//!
//! The store is the resumption mechanism of the downloader: a block whose
//! file exists, parses, and carries the expected `number` is never fetched
//! again. Anything else (missing, truncated, foreign content) is treated as
//! absent and overwritten by the next successful fetch.
//!
//! Writes go to a hidden temporary file in the same directory which is
//! fsynced and then atomically renamed over the canonical path, so an
//! interrupted run cannot leave a partial file under a record name. Temporary
//! files orphaned by a killed process are swept by the next run that holds
//! the store lock.

use crate::range::{BlockNumber, BlockRange};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub mod lock;
pub mod path;
pub mod record;

pub use lock::StoreLock;
pub use record::StoredRecord;

/// Upper bound on a record file we are willing to load into memory (256 MB)
pub const MAX_RECORD_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error on a specific path
    #[error("IO error at {path}: {reason}")]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying error message
        reason: String,
    },

    /// Stored record exists but failed validation
    #[error("invalid record {path}: {reason}")]
    InvalidRecord {
        /// Path of the rejected file
        path: PathBuf,
        /// Why the record was rejected
        reason: String,
    },

    /// Record could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Another run holds the store lock
    #[error("store is locked ({path}): {reason}")]
    Locked {
        /// Lock file path
        path: PathBuf,
        /// Lock failure reason
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// State of one block in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// File present and structurally valid
    Valid {
        /// Length of the stored transaction list
        tx_count: u64,
    },
    /// No file for the block
    Missing,
    /// File present but unreadable, unparsable or foreign
    Invalid {
        /// Rejection reason
        reason: String,
    },
}

/// Directory of `bdf-{number}.json` block files
#[derive(Debug, Clone)]
pub struct RecordStore {
    blocks_dir: PathBuf,
}

impl RecordStore {
    /// Open (and create if needed) the store under `output_dir/blocks`
    pub fn open(output_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let blocks_dir = path::blocks_dir(output_dir.as_ref());
        std::fs::create_dir_all(&blocks_dir).map_err(|e| StoreError::io(&blocks_dir, e))?;
        debug!(blocks_dir = %blocks_dir.display(), "Opened record store");
        Ok(Self { blocks_dir })
    }

    /// Directory holding the block files
    pub fn blocks_dir(&self) -> &Path {
        &self.blocks_dir
    }

    /// Canonical path for `block`
    pub fn path_for(&self, block: BlockNumber) -> PathBuf {
        path::record_path(&self.blocks_dir, block)
    }

    /// Take the exclusive run lock on this store
    pub fn lock(&self) -> StoreResult<StoreLock> {
        StoreLock::try_acquire(&self.blocks_dir)
    }

    /// Whether a complete, structurally valid record exists for `block`
    ///
    /// Never errors: any read or parse failure simply means "not valid".
    pub fn exists_and_valid(&self, block: BlockNumber) -> bool {
        matches!(self.inspect(block), RecordState::Valid { .. })
    }

    /// Transaction count of a stored block
    ///
    /// Only meaningful after [`exists_and_valid`](Self::exists_and_valid) returned true.
    pub fn read_tx_count(&self, block: BlockNumber) -> StoreResult<u64> {
        Ok(self.load(block)?.tx_count())
    }

    /// Classify the stored state of `block` with a single read
    pub fn inspect(&self, block: BlockNumber) -> RecordState {
        match self.load(block) {
            Ok(record) => RecordState::Valid {
                tx_count: record.tx_count(),
            },
            Err(StoreError::Io { reason, .. }) if !self.path_for(block).exists() => {
                trace!(block, reason = %reason, "No stored record");
                RecordState::Missing
            }
            Err(e) => {
                debug!(block, error = %e, "Stored record rejected");
                RecordState::Invalid {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Transaction counts of the leading run of valid records in `range`
    ///
    /// Stops at the first block that is not valid, so an interrupted download
    /// is resumed with a single read per completed block.
    pub fn valid_prefix(&self, range: BlockRange) -> Vec<u64> {
        let mut counts = Vec::new();
        for block in range.iter() {
            match self.inspect(block) {
                RecordState::Valid { tx_count } => counts.push(tx_count),
                RecordState::Missing | RecordState::Invalid { .. } => break,
            }
        }
        counts
    }

    /// Load and validate the stored record for `block`
    pub fn load(&self, block: BlockNumber) -> StoreResult<StoredRecord> {
        let path = self.path_for(block);

        let metadata = std::fs::metadata(&path).map_err(|e| StoreError::io(&path, e))?;
        if metadata.len() > MAX_RECORD_FILE_SIZE {
            return Err(StoreError::InvalidRecord {
                path,
                reason: format!(
                    "file size {} exceeds limit {}",
                    metadata.len(),
                    MAX_RECORD_FILE_SIZE
                ),
            });
        }

        let contents = std::fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        let record: StoredRecord =
            serde_json::from_slice(&contents).map_err(|e| StoreError::InvalidRecord {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        record
            .validate_identity(block)
            .map_err(|reason| StoreError::InvalidRecord { path, reason })?;

        Ok(record)
    }

    /// Persist `raw` as the record for `block`, replacing any previous file
    ///
    /// Uses tempfile::NamedTempFile in the blocks directory and an atomic
    /// rename, so readers see either the old file, the new file, or nothing.
    pub fn save(&self, block: BlockNumber, raw: &Value) -> StoreResult<PathBuf> {
        self.save_record(block, &StoredRecord::wrap(raw.clone()))
    }

    /// Persist an already wrapped record for `block`
    pub fn save_record(&self, block: BlockNumber, record: &StoredRecord) -> StoreResult<PathBuf> {
        let path = self.path_for(block);
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut temp_file = tempfile::Builder::new()
            .prefix(path::TEMP_FILE_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.blocks_dir)
            .map_err(|e| StoreError::io(&self.blocks_dir, e))?;

        temp_file
            .write_all(&json)
            .map_err(|e| StoreError::io(temp_file.path(), e))?;
        temp_file
            .flush()
            .map_err(|e| StoreError::io(temp_file.path(), e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StoreError::io(temp_file.path(), e))?;

        temp_file
            .persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        trace!(block, path = %path.display(), bytes = json.len(), "Saved block record");
        Ok(path)
    }

    /// Delete temporary files left behind by a run that was killed mid-write
    ///
    /// Must only be called while holding the store lock, otherwise it could
    /// race a live writer.
    pub fn remove_stale_temp_files(&self) -> StoreResult<usize> {
        let entries =
            std::fs::read_dir(&self.blocks_dir).map_err(|e| StoreError::io(&self.blocks_dir, e))?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.blocks_dir, e))?;
            let name = entry.file_name();
            let is_temp = name
                .to_str()
                .is_some_and(|n| n.starts_with(path::TEMP_FILE_PREFIX) && n.ends_with(".tmp"));
            if !is_temp {
                continue;
            }
            let temp_path = entry.path();
            std::fs::remove_file(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
            debug!(path = %temp_path.display(), "Removed stale temporary file");
            removed += 1;
        }
        Ok(removed)
    }

    /// Block numbers of every record-named file in the store, ascending
    ///
    /// Only file names are inspected; use [`inspect`](Self::inspect) to validate.
    pub fn stored_blocks(&self) -> StoreResult<Vec<BlockNumber>> {
        let entries =
            std::fs::read_dir(&self.blocks_dir).map_err(|e| StoreError::io(&self.blocks_dir, e))?;

        let mut blocks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.blocks_dir, e))?;
            if let Some(block) = entry
                .file_name()
                .to_str()
                .and_then(path::parse_record_file_name)
            {
                blocks.push(block);
            }
        }
        blocks.sort_unstable();
        Ok(blocks)
    }
}
