//! Advisory lock guarding a block store against concurrent download runs
//!
//! Implemented with fd-lock on `{blocks_dir}/.download.lock`.

use super::{StoreError, StoreResult};
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the lock file inside the blocks directory
pub const LOCK_FILE_NAME: &str = ".download.lock";

/// Exclusive lock held for the duration of a download run
#[derive(Debug)]
pub struct StoreLock {
    _lock: RwLock<File>,
    path: PathBuf,
}

impl StoreLock {
    /// Try to take the exclusive lock without blocking
    ///
    /// Fails immediately with [`StoreError::Locked`] if another run holds it.
    pub fn try_acquire(blocks_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(blocks_dir).map_err(|e| StoreError::io(blocks_dir, e))?;

        let path = blocks_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        let mut lock = RwLock::new(file);
        let guard = lock.try_write().map_err(|e| StoreError::Locked {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        // The lock lives as long as the descriptor; it is released when `_lock` is dropped.
        std::mem::forget(guard);

        Ok(Self { _lock: lock, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
