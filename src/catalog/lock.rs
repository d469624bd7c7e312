//! catalog::lock
//!
//! Advisory lock serializing role cache refreshes across processes.
//!
//! # Invariants
//!
//! - The lock is held for the whole remote walk and the cache write
//! - After acquiring it, callers re-read the cache: another process may have
//!   refreshed it while this one waited
//! - The lock is released on drop
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ssoenv::catalog::CacheLock;
//!
//! # async fn run() -> Result<(), ssoenv::catalog::CatalogError> {
//! let lock = CacheLock::acquire("/home/me/.ssoenv/cache.lock".as_ref(), Duration::from_secs(30)).await?;
//! assert!(lock.is_held());
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use tokio::time::{sleep, Instant};

use super::errors::CatalogError;

/// Default wait for the cache lock. A refresh walks every account, so this
/// is generous.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(120);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusive lock on the cache lock file.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
    file: Option<File>,
}

impl CacheLock {
    /// Wait for the lock, polling every 100ms until `timeout` passes.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::LockTimeout`] if another process keeps the lock
    /// - [`CatalogError::Lock`] on I/O failure
    pub async fn acquire(path: &Path, timeout: Duration) -> Result<Self, CatalogError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                return Ok(lock);
            }
            if Instant::now() >= deadline {
                return Err(CatalogError::LockTimeout(path.to_path_buf()));
            }
            tracing::debug!(path = %path.display(), "waiting for cache lock");
            sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Take the lock if it is free.
    ///
    /// Returns `Ok(None)` if another holder has it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, CatalogError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CatalogError::Lock(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CatalogError::Lock(format!("cannot open {}: {}", path.display(), e)))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file: Some(file),
            })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(CatalogError::Lock(format!("lock failed: {}", e))),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), CatalogError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| CatalogError::Lock(format!("unlock failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.lock");

        let mut lock = CacheLock::acquire(&path, Duration::from_secs(1)).await.unwrap();
        assert!(lock.is_held());
        assert_eq!(lock.path(), path.as_path());
        lock.release().unwrap();
        assert!(!lock.is_held());

        let again = CacheLock::try_acquire(&path).unwrap();
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn held_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.lock");

        let _held = CacheLock::try_acquire(&path).unwrap().unwrap();
        assert!(CacheLock::try_acquire(&path).unwrap().is_none());

        let err = CacheLock::acquire(&path, Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::LockTimeout(_)));
    }

    #[tokio::test]
    async fn drop_releases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.lock");
        {
            let _lock = CacheLock::try_acquire(&path).unwrap().unwrap();
        }
        assert!(CacheLock::try_acquire(&path).unwrap().is_some());
    }
}
