use std::path::PathBuf;
use std::sync::Arc;
use std::{fmt, io};

use thiserror::Error;

use crate::common::file_operations::FileOperationError;
use crate::directory::error::{LockError, OpenReadError};

/// Represents a `DataCorruption` error.
///
/// Raised when a committed meta file can not be decoded.
#[derive(Clone)]
pub struct DataCorruption {
    filepath: Option<PathBuf>,
    comment: String,
}

impl DataCorruption {
    /// Creates a `DataCorruption` Error.
    pub fn new(filepath: PathBuf, comment: String) -> DataCorruption {
        DataCorruption { filepath: Some(filepath), comment }
    }

    /// Creates a `DataCorruption` Error, when the filepath is irrelevant.
    pub fn comment_only<TStr: ToString>(comment: TStr) -> DataCorruption {
        DataCorruption { filepath: None, comment: comment.to_string() }
    }
}

impl fmt::Debug for DataCorruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Data corruption")?;
        if let Some(ref filepath) = &self.filepath {
            write!(f, " (in file `{filepath:?}`)")?;
        }
        write!(f, ": {}.", self.comment)?;
        Ok(())
    }
}

/// The library's error enum
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// IO Error.
    #[error("An IO error occurred: '{0}'")]
    IoError(Arc<io::Error>),
    /// Data corruption.
    #[error("Data corrupted: '{0:?}'")]
    DataCorruption(DataCorruption),
    /// Failed to acquire the directory lock.
    #[error("Failed to acquire Lockfile: {0:?}. {1:?}")]
    LockFailure(LockError, Option<String>),
    /// The writer could not be obtained or can no longer be trusted.
    #[error("Index writer of '{index_name}' is unavailable: {reason}")]
    WriterUnavailable { index_name: String, reason: String },
    /// Opening or closing a reader snapshot failed.
    #[error("Snapshot IO failure on '{index_name}': {reason}")]
    SnapshotIo { index_name: String, reason: String },
    /// The caller broke the usage contract, e.g. asked for a reader after shutdown.
    #[error("Invariant violated: '{0}'")]
    InvariantViolation(String),
    /// Invalid argument was passed by the user.
    #[error("An invalid argument was passed: '{0}'")]
    InvalidArgument(String),
    /// An Error occurred in one of the threads.
    #[error("An error occurred in a thread: '{0}'")]
    ErrorInThread(String),
    /// System error. (e.g.: We failed spawning a new thread).
    #[error("System error.'{0}'")]
    SystemError(String),
    /// Failed to open a file for read.
    #[error("Failed to open file for read: '{0:?}'")]
    OpenReadError(#[from] OpenReadError),

    #[error("'{0:?}'")]
    FileOperationError(#[from] FileOperationError),
}

impl WorkspaceError {
    /// Shorthand for [`WorkspaceError::WriterUnavailable`].
    pub fn writer_unavailable<S: ToString>(index_name: &str, reason: S) -> Self {
        WorkspaceError::WriterUnavailable {
            index_name: index_name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`WorkspaceError::SnapshotIo`].
    pub fn snapshot_io<S: ToString>(index_name: &str, reason: S) -> Self {
        WorkspaceError::SnapshotIo { index_name: index_name.to_string(), reason: reason.to_string() }
    }

    /// Failures after which the writer state can not be trusted anymore.
    ///
    /// The commit policies answer these with a forced lock release, never a clean close.
    pub fn is_writer_failure(&self) -> bool {
        matches!(
            self,
            WorkspaceError::WriterUnavailable { .. }
                | WorkspaceError::LockFailure(..)
                | WorkspaceError::IoError(_)
                | WorkspaceError::DataCorruption(_)
        )
    }
}

impl From<io::Error> for WorkspaceError {
    fn from(io_err: io::Error) -> WorkspaceError {
        WorkspaceError::IoError(Arc::new(io_err))
    }
}

impl From<DataCorruption> for WorkspaceError {
    fn from(data_corruption: DataCorruption) -> WorkspaceError {
        WorkspaceError::DataCorruption(data_corruption)
    }
}

impl From<LockError> for WorkspaceError {
    fn from(lock_error: LockError) -> WorkspaceError {
        WorkspaceError::LockFailure(lock_error, None)
    }
}

impl From<serde_json::Error> for WorkspaceError {
    fn from(serde_error: serde_json::Error) -> WorkspaceError {
        WorkspaceError::SystemError(serde_error.to_string())
    }
}

impl From<validator::ValidationErrors> for WorkspaceError {
    fn from(errors: validator::ValidationErrors) -> WorkspaceError {
        WorkspaceError::InvalidArgument(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_failure_classification() {
        assert!(WorkspaceError::writer_unavailable("books", "lock busy").is_writer_failure());
        assert!(WorkspaceError::from(LockError::LockBusy).is_writer_failure());
        assert!(WorkspaceError::from(io::Error::new(io::ErrorKind::Other, "disk")).is_writer_failure());
        assert!(!WorkspaceError::snapshot_io("books", "closed").is_writer_failure());
        assert!(!WorkspaceError::InvalidArgument("empty term".to_string()).is_writer_failure());
    }

    #[test]
    fn test_data_corruption_debug() {
        let corruption = DataCorruption::new(PathBuf::from("meta.json"), "bad json".to_string());
        assert_eq!(format!("{corruption:?}"), "Data corruption (in file `\"meta.json\"`): bad json.");
        let corruption = DataCorruption::comment_only("truncated");
        assert_eq!(format!("{corruption:?}"), "Data corruption: truncated.");
    }
}
