//! Advisory file locking for the persisted index
//!
//! A sibling `.lock` file next to the index artifact serializes writers
//! across processes. The guard releases the lock on drop, so a crash or
//! early return never leaves the artifact locked.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// RAII guard holding an exclusive advisory lock on the index artifact
#[derive(Debug)]
pub struct IndexLock {
    file: File,
    path: PathBuf,
}

impl IndexLock {
    /// Lock path for a given index artifact: `index.bin` -> `index.bin.lock`
    pub fn lock_path(index_path: &Path) -> PathBuf {
        let mut name = index_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "index.bin".into());
        name.push(".lock");
        index_path.with_file_name(name)
    }

    /// Block until the exclusive lock is acquired
    pub fn acquire(index_path: &Path) -> StoreResult<Self> {
        let path = Self::lock_path(index_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        file.lock_exclusive().map_err(|source| StoreError::Lock {
            path: path.clone(),
            source,
        })?;
        debug!("Acquired index lock at {}", path.display());
        Ok(Self { file, path })
    }

    /// Acquire without blocking; Ok(None) when another process holds it
    pub fn try_acquire(index_path: &Path) -> StoreResult<Option<Self>> {
        let path = Self::lock_path(index_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(StoreError::Lock { path, source }),
        }
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        // Fully qualified to avoid colliding with std's File locking
        if let Err(err) = fs2::FileExt::unlock(&self.file) {
            warn!("Failed to release index lock {}: {err}", self.path.display());
        }
    }
}
