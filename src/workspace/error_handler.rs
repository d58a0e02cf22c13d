use std::fmt;

use log::error;

use crate::common::thread_name;
use crate::indexer::OperationKind;
use crate::WorkspaceError;

/// What was going on when an error happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPhase {
    AcquireWriter,
    ApplyOperation(OperationKind),
    Flush,
    Commit,
    Close,
    ForceRelease,
    Rollback,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPhase::AcquireWriter => f.write_str("acquire_writer"),
            ErrorPhase::ApplyOperation(kind) => write!(f, "apply {kind}"),
            ErrorPhase::Flush => f.write_str("flush"),
            ErrorPhase::Commit => f.write_str("commit"),
            ErrorPhase::Close => f.write_str("close"),
            ErrorPhase::ForceRelease => f.write_str("force_release_lock"),
            ErrorPhase::Rollback => f.write_str("rollback"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ErrorContext<'a> {
    pub index_name: &'a str,
    pub phase: ErrorPhase,
}

impl<'a> ErrorContext<'a> {
    pub fn new(index_name: &'a str, phase: ErrorPhase) -> ErrorContext<'a> {
        ErrorContext { index_name, phase }
    }
}

/// Receives the failures of background work, which have no caller to return them to.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, context: ErrorContext<'_>, error: &WorkspaceError);
}

/// Logs every error.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, context: ErrorContext<'_>, error: &WorkspaceError) {
        error!(
            "[{}] [{}] index '{}' failed: {}",
            thread_name(),
            context.phase,
            context.index_name,
            error
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use parking_lot::Mutex;

    use super::*;

    /// Keeps `(index_name, phase, message)` of every reported error.
    #[derive(Default)]
    pub(crate) struct RecordingErrorHandler {
        pub(crate) errors: Mutex<Vec<(String, ErrorPhase, String)>>,
    }

    impl RecordingErrorHandler {
        pub(crate) fn phases(&self) -> Vec<ErrorPhase> {
            self.errors.lock().iter().map(|(_, phase, _)| *phase).collect()
        }
    }

    impl ErrorHandler for RecordingErrorHandler {
        fn handle(&self, context: ErrorContext<'_>, error: &WorkspaceError) {
            self.errors.lock().push((context.index_name.to_string(), context.phase, error.to_string()));
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ErrorPhase::ApplyOperation(OperationKind::PurgeAll).to_string(), "apply purge_all");
        assert_eq!(ErrorPhase::ForceRelease.to_string(), "force_release_lock");
    }

    #[test]
    fn test_recording_handler() {
        let handler = RecordingErrorHandler::default();
        handler.handle(
            ErrorContext::new("books", ErrorPhase::Commit),
            &WorkspaceError::InvalidArgument("x".to_string()),
        );
        LogErrorHandler.handle(
            ErrorContext::new("books", ErrorPhase::Commit),
            &WorkspaceError::InvalidArgument("x".to_string()),
        );
        assert_eq!(handler.phases(), vec![ErrorPhase::Commit]);
        assert_eq!(handler.errors.lock()[0].0, "books");
    }
}
