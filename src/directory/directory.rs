use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, io, thread};

use log::debug;

use crate::directory::directory_lock::Lock;
use crate::directory::error::{LockError, OpenReadError};

/// Retry policy for acquiring a blocking lock.
struct RetryPolicy {
    num_retries: usize,
    wait_in_ms: u64,
}

impl RetryPolicy {
    fn no_retry() -> RetryPolicy {
        RetryPolicy { num_retries: 0, wait_in_ms: 0 }
    }

    fn wait_and_retry(&mut self) -> bool {
        if self.num_retries == 0 {
            false
        } else {
            self.num_retries -= 1;
            let wait_duration = Duration::from_millis(self.wait_in_ms);
            thread::sleep(wait_duration);
            true
        }
    }
}

/// The `DirectoryLock` is an object that represents a file lock.
///
/// It is associated with a lock file, that gets deleted on `Drop.`
pub struct DirectoryLock(Box<dyn Send + Sync + 'static>);

impl<T: Send + Sync + 'static> From<Box<T>> for DirectoryLock {
    fn from(underlying: Box<T>) -> Self {
        DirectoryLock(underlying)
    }
}

impl fmt::Debug for DirectoryLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectoryLock")
    }
}

/// Storage abstraction of one physical index.
///
/// Files are written atomically and as a whole; the index writer never appends.
/// Locks are plain files whose content identifies the holder, so that a guard dropped
/// after a forced release never deletes a lock re-acquired by someone else.
pub trait Directory: DirectoryClone + fmt::Debug + Send + Sync + 'static {
    /// Reads the full content of a file.
    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError>;

    /// Atomically replaces the content of a file.
    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Returns true if the file exists.
    fn exists(&self, path: &Path) -> Result<bool, OpenReadError>;

    /// Removes a file. Removing a missing file is not an error.
    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Lists the files of the directory, lock files included.
    fn list_files(&self) -> io::Result<Vec<PathBuf>>;

    /// Makes previous writes durable.
    fn sync_directory(&self) -> io::Result<()> {
        Ok(())
    }

    /// Creates the lock file if it does not exist yet.
    ///
    /// Returns `LockError::LockBusy` right away if the lock is held.
    fn try_acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, LockError>;

    /// Acquires a lock, retrying for a while if the lock is a blocking one.
    fn acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, LockError> {
        let mut retry_policy = if lock.is_blocking {
            RetryPolicy { num_retries: 100, wait_in_ms: 100 }
        } else {
            RetryPolicy::no_retry()
        };
        loop {
            match self.try_acquire_lock(lock) {
                Ok(directory_lock) => return Ok(directory_lock),
                Err(LockError::LockBusy) => {
                    debug!("[acquire_lock] lock {:?} busy", lock.filepath);
                    if !retry_policy.wait_and_retry() {
                        return Err(LockError::LockBusy);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Removes the lock file, whoever holds it.
    fn force_release_lock(&self, lock: &Lock) -> io::Result<()> {
        self.delete(&lock.filepath)
    }

    /// Returns true if somebody holds `lock`.
    fn is_locked(&self, lock: &Lock) -> bool {
        self.exists(&lock.filepath).unwrap_or(false)
    }
}

/// DirectoryClone
pub trait DirectoryClone {
    /// Clones the directory and boxes the clone
    fn box_clone(&self) -> Box<dyn Directory>;
}

impl<T> DirectoryClone for T
where
    T: 'static + Directory + Clone,
{
    fn box_clone(&self) -> Box<dyn Directory> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Directory> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl<D: Directory> From<D> for Box<dyn Directory> {
    fn from(directory: D) -> Box<dyn Directory> {
        Box::new(directory)
    }
}
