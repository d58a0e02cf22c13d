use std::path::PathBuf;

use once_cell::sync::Lazy;

/// A directory lock.
///
/// A lock is associated with a specific path.
///
/// The lock will be passed to [`Directory::acquire_lock`](crate::directory::Directory::acquire_lock).
#[derive(Debug)]
pub struct Lock {
    /// The lock needs to be associated with its own file `path`.
    /// Depending on the platform, the lock might rely on the creation
    /// and deletion of this filepath.
    pub filepath: PathBuf,
    /// `is_blocking` describes whether acquiring the lock is meant
    /// to be a blocking operation or a non-blocking.
    ///
    /// Acquiring a blocking lock blocks until the lock is
    /// available.
    ///
    /// Acquiring a non-blocking lock returns rapidly, either successfully
    /// or with an error signifying that someone is already holding
    /// the lock.
    pub is_blocking: bool,
}

/// Only one writer should be able to write an index at a time.
/// This lock file, when present, is in charge of preventing other writers to open.
///
/// If the process is killed and this file remains, it is safe to remove it manually,
/// which is what [`WriterHolder::force_release_lock`](crate::workspace::WriterHolder::force_release_lock)
/// does after a failure that may have corrupted the writer.
pub static INDEX_WRITER_LOCK: Lazy<Lock> =
    Lazy::new(|| Lock { filepath: PathBuf::from(".index-writer.lock"), is_blocking: false });
