use std::sync::Arc;

use log::{info, warn};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error_handler::{ErrorContext, ErrorHandler, ErrorPhase};
use crate::common::thread_name;
use crate::directory::{Directory, INDEX_WRITER_LOCK};
use crate::index::Index;
use crate::indexer::IndexWriter;
use crate::reader::Snapshot;
use crate::{Opstamp, WorkspaceError};

/// Owns the writer of one index and its directory lock.
///
/// Besides the writer itself, the holder carries a read/write lock over the directory
/// content. Mutations, commits and closes take it exclusively; NRT snapshot opens and
/// directory copies take it shared, so a copy never observes a half-applied changeset.
pub struct WriterHolder {
    index_name: String,
    index: Index,
    writer: Mutex<Option<Arc<IndexWriter>>>,
    directory_lock: RwLock<()>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl WriterHolder {
    pub fn new(index_name: &str, index: Index, error_handler: Arc<dyn ErrorHandler>) -> WriterHolder {
        WriterHolder {
            index_name: index_name.to_string(),
            index,
            writer: Mutex::new(None),
            directory_lock: RwLock::new(()),
            error_handler,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Returns the open writer, opening it first if needed.
    ///
    /// # Errors
    /// `WriterUnavailable` when the directory lock is held by somebody else or the index
    /// can not be loaded.
    pub fn acquire_writer(&self) -> crate::Result<Arc<IndexWriter>> {
        let mut writer = self.writer.lock();
        if let Some(writer) = writer.as_ref() {
            return Ok(writer.clone());
        }
        let opened = Arc::new(
            self.index
                .writer()
                .map_err(|err| WorkspaceError::writer_unavailable(&self.index_name, err))?,
        );
        info!("[{}] [acquire_writer] opened writer of '{}'", thread_name(), self.index_name);
        *writer = Some(opened.clone());
        Ok(opened)
    }

    pub fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Blocks copies and NRT snapshot opens until the guard is dropped.
    pub(crate) fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.directory_lock.write()
    }

    /// Blocks mutations, commits and closes until the guard is dropped.
    pub fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.directory_lock.read()
    }

    /// Durably commits the pending changes of the open writer, if any.
    pub fn commit(&self) -> crate::Result<Option<Opstamp>> {
        let _guard = self.write_lock();
        let writer = match self.writer.lock().clone() {
            Some(writer) => writer,
            None => return Ok(None),
        };
        writer.commit().map(Some).map_err(|err| self.report(ErrorPhase::Commit, err))
    }

    /// Commits; when the commit fails, the writer is dropped and the lock released so the
    /// changes which could not be made durable are never committed later.
    pub fn commit_or_release(&self) -> crate::Result<Option<Opstamp>> {
        self.commit().map_err(|err| {
            if let Err(release_err) = self.force_release_lock() {
                warn!(
                    "[{}] [commit_or_release] '{}' release after failed commit: {}",
                    thread_name(),
                    self.index_name,
                    release_err
                );
            }
            err
        })
    }

    /// Commits; when the commit fails, the writer stays open and goes back to the last
    /// commit.
    pub fn commit_or_rollback(&self) -> crate::Result<Option<Opstamp>> {
        self.commit().map_err(|err| {
            if let Err(rollback_err) = self.rollback() {
                warn!(
                    "[{}] [commit_or_rollback] '{}' rollback after failed commit: {}",
                    thread_name(),
                    self.index_name,
                    rollback_err
                );
            }
            err
        })
    }

    /// Commits then closes the writer, releasing the directory lock.
    pub fn close(&self) -> crate::Result<()> {
        let _guard = self.write_lock();
        let writer = match self.writer.lock().take() {
            Some(writer) => writer,
            None => return Ok(()),
        };
        let result = writer.commit().map(|_| ()).map_err(|err| self.report(ErrorPhase::Close, err));
        drop(writer);
        info!("[{}] [close] closed writer of '{}'", thread_name(), self.index_name);
        result
    }

    /// Discards the uncommitted changes of the open writer, keeping it open.
    pub fn rollback(&self) -> crate::Result<()> {
        let _guard = self.write_lock();
        let writer = self.writer.lock().clone();
        match writer {
            Some(writer) => self.rollback_unlocked(&writer),
            None => Ok(()),
        }
    }

    /// Rollback for callers already holding the write lock.
    pub(crate) fn rollback_unlocked(&self, writer: &IndexWriter) -> crate::Result<()> {
        writer.rollback().map(|_| ()).map_err(|err| self.report(ErrorPhase::Rollback, err))
    }

    /// Drops the writer without committing and clears the directory lock, whoever holds it.
    ///
    /// Used after failures which leave the writer state untrustworthy.
    pub fn force_release_lock(&self) -> crate::Result<()> {
        let _guard = self.write_lock();
        if let Some(writer) = self.writer.lock().take() {
            if let Err(err) = writer.rollback() {
                warn!(
                    "[{}] [force_release_lock] rollback of '{}' failed: {}",
                    thread_name(),
                    self.index_name,
                    err
                );
            }
        }
        self.index
            .directory()
            .force_release_lock(&INDEX_WRITER_LOCK)
            .map_err(|err| self.report(ErrorPhase::ForceRelease, err.into()))?;
        warn!("[{}] [force_release_lock] released lock of '{}'", thread_name(), self.index_name);
        Ok(())
    }

    /// Opens a snapshot including uncommitted changes.
    ///
    /// Falls back to the last commit when no writer is open.
    pub fn open_nrt_snapshot(&self, apply_deletes: bool) -> crate::Result<Snapshot> {
        let _guard = self.read_lock();
        let writer = self.writer.lock().clone();
        match writer {
            Some(writer) => Ok(writer.nrt_snapshot(apply_deletes)),
            None => self.committed_snapshot(),
        }
    }

    /// Opens a snapshot of the last durable commit.
    pub fn committed_snapshot(&self) -> crate::Result<Snapshot> {
        self.index
            .committed_snapshot()
            .map_err(|err| WorkspaceError::snapshot_io(&self.index_name, err))
    }

    /// Copies the committed files of the index into `target`, while no mutation runs.
    pub fn copy_to(&self, target: &dyn Directory) -> crate::Result<usize> {
        let _guard = self.read_lock();
        self.index.copy_files_to(target)
    }

    pub(crate) fn report(&self, phase: ErrorPhase, error: WorkspaceError) -> WorkspaceError {
        self.error_handler.handle(ErrorContext::new(&self.index_name, phase), &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::core::Term;
    use crate::directory::RamDirectory;
    use crate::workspace::error_handler::tests::RecordingErrorHandler;
    use crate::workspace::error_handler::LogErrorHandler;

    fn holder() -> WriterHolder {
        WriterHolder::new("books", Index::create_in_ram(), Arc::new(LogErrorHandler))
    }

    #[test]
    fn test_acquire_reuses_open_writer() {
        let holder = holder();
        assert!(!holder.is_open());
        let first = holder.acquire_writer().unwrap();
        let second = holder.acquire_writer().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(holder.index().directory().is_locked(&INDEX_WRITER_LOCK));
    }

    #[test]
    fn test_close_commits_and_releases_lock() {
        let holder = holder();
        let writer = holder.acquire_writer().unwrap();
        writer.add_document(doc!("a")).unwrap();
        drop(writer);
        holder.close().unwrap();
        assert!(!holder.is_open());
        assert!(!holder.index().directory().is_locked(&INDEX_WRITER_LOCK));
        assert!(holder.committed_snapshot().unwrap().contains(&Term::for_id("a")));
    }

    #[test]
    fn test_foreign_lock_makes_writer_unavailable() {
        let errors = Arc::new(RecordingErrorHandler::default());
        let holder = WriterHolder::new("books", Index::create_in_ram(), errors.clone());
        let _foreign_lock = holder.index().directory().acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        match holder.acquire_writer() {
            Err(err @ WorkspaceError::WriterUnavailable { .. }) => assert!(err.is_writer_failure()),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
        holder.force_release_lock().unwrap();
        assert!(holder.acquire_writer().is_ok());
        assert!(errors.phases().is_empty());
    }

    #[test]
    fn test_force_release_discards_uncommitted() {
        let holder = holder();
        let writer = holder.acquire_writer().unwrap();
        writer.add_document(doc!("a")).unwrap();
        holder.commit().unwrap();
        writer.add_document(doc!("b")).unwrap();
        drop(writer);
        holder.force_release_lock().unwrap();
        assert!(!holder.is_open());
        let snapshot = holder.open_nrt_snapshot(false).unwrap();
        assert!(snapshot.contains(&Term::for_id("a")));
        assert!(!snapshot.contains(&Term::for_id("b")));
    }

    #[test]
    fn test_nrt_snapshot_sees_uncommitted() {
        let holder = holder();
        holder.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        assert!(holder.open_nrt_snapshot(false).unwrap().contains(&Term::for_id("a")));
        assert!(!holder.committed_snapshot().unwrap().contains(&Term::for_id("a")));
        holder.rollback().unwrap();
        assert!(!holder.open_nrt_snapshot(false).unwrap().contains(&Term::for_id("a")));
    }

    #[test]
    fn test_copy_waits_for_mutation() {
        let holder = Arc::new(holder());
        let writer = holder.acquire_writer().unwrap();
        let target = RamDirectory::create();

        let guard = holder.write_lock();
        let copier = {
            let holder = holder.clone();
            let target = target.clone();
            thread::spawn(move || holder.copy_to(&target).unwrap())
        };
        thread::sleep(Duration::from_millis(50));
        writer.add_document(doc!("a")).unwrap();
        writer.commit().unwrap();
        drop(guard);

        assert_eq!(copier.join().unwrap(), 1);
        let copied = Index::open_or_create(target).unwrap();
        assert!(copied.committed_snapshot().unwrap().contains(&Term::for_id("a")));
    }
}
