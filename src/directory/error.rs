use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Error while trying to acquire a directory [lock](crate::directory::Lock).
///
/// This is returned from [`Directory::acquire_lock`](crate::directory::Directory::acquire_lock).
#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// Failed to acquired a lock as it is already held by another
    /// client.
    /// - In the context of a blocking lock, this means the lock was not released within some
    ///   `timeout` period.
    /// - In the context of a non-blocking lock, this means the lock was busy at the moment of the
    ///   call.
    #[error("Could not acquire lock as it is already held, possibly by a different process.")]
    LockBusy,
    /// Trying to acquire a lock failed with an `IoError`
    #[error("Failed to acquire the lock due to an io:Error.")]
    IoError(Arc<io::Error>),
}

impl LockError {
    /// Wraps an io error.
    pub fn wrap_io_error(io_error: io::Error) -> Self {
        Self::IoError(Arc::new(io_error))
    }
}

/// Error that may occur when reading a file.
#[derive(Debug, Clone, Error)]
pub enum OpenReadError {
    /// The file does not exist.
    #[error("Files does not exist: {0:?}")]
    FileDoesNotExist(PathBuf),
    /// Any kind of io::Error.
    #[error("IoError '{io_error:?}' while opening file {filepath:?} for read.")]
    IoError {
        /// The underlying `io::Error`.
        io_error: Arc<io::Error>,
        /// File path of the file that could not be read.
        filepath: PathBuf,
    },
}

impl OpenReadError {
    /// Wraps an io error.
    pub fn wrap_io_error(io_error: io::Error, filepath: PathBuf) -> Self {
        if io_error.kind() == io::ErrorKind::NotFound {
            return Self::FileDoesNotExist(filepath);
        }
        Self::IoError { io_error: Arc::new(io_error), filepath }
    }
}
