use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use super::writer_holder::WriterHolder;
use crate::common::thread_name;
use crate::config::CommitPolicyKind;
use crate::indexer::IndexWriter;
use crate::WorkspaceError;

/// Observable state of a commit policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyState {
    Closed,
    OpenExclusive,
    /// Writer open, with the number of changesets currently using it.
    OpenShared(usize),
}

/// Decides what happens to the writer around each changeset.
pub trait CommitPolicy: Send + Sync + 'static {
    fn kind(&self) -> CommitPolicyKind;

    /// Returns the writer for a changeset about to be applied.
    ///
    /// Every successful call must be followed by exactly one
    /// [`CommitPolicy::changeset_applied`].
    fn acquire_writer(&self) -> crate::Result<Arc<IndexWriter>>;

    /// Called once the changeset acquired with [`CommitPolicy::acquire_writer`] completed.
    fn changeset_applied(&self, failed: bool, streaming: bool) -> crate::Result<()>;

    /// Makes everything applied so far durable.
    fn flush(&self) -> crate::Result<()>;

    fn state(&self) -> PolicyState;

    /// Closes the writer.
    fn shutdown(&self) -> crate::Result<()>;
}

pub fn new_commit_policy(kind: CommitPolicyKind, holder: Arc<WriterHolder>) -> Arc<dyn CommitPolicy> {
    match kind {
        CommitPolicyKind::Exclusive => Arc::new(ExclusiveCommitPolicy::new(holder)),
        CommitPolicyKind::Shared => Arc::new(SharedCommitPolicy::new(holder)),
        CommitPolicyKind::Nrt => Arc::new(super::nrt_commit_policy::NrtCommitPolicy::new(holder)),
    }
}

/// The workspace is the only user of the writer, which stays open between changesets.
/// Every non-streaming changeset is committed.
pub struct ExclusiveCommitPolicy {
    holder: Arc<WriterHolder>,
}

impl ExclusiveCommitPolicy {
    pub fn new(holder: Arc<WriterHolder>) -> ExclusiveCommitPolicy {
        ExclusiveCommitPolicy { holder }
    }
}

impl CommitPolicy for ExclusiveCommitPolicy {
    fn kind(&self) -> CommitPolicyKind {
        CommitPolicyKind::Exclusive
    }

    fn acquire_writer(&self) -> crate::Result<Arc<IndexWriter>> {
        self.holder.acquire_writer()
    }

    fn changeset_applied(&self, failed: bool, streaming: bool) -> crate::Result<()> {
        if failed {
            self.holder.force_release_lock()
        } else if !streaming {
            self.holder.commit_or_release().map(|_| ())
        } else {
            Ok(())
        }
    }

    fn flush(&self) -> crate::Result<()> {
        self.holder.commit().map(|_| ())
    }

    fn state(&self) -> PolicyState {
        if self.holder.is_open() {
            PolicyState::OpenExclusive
        } else {
            PolicyState::Closed
        }
    }

    fn shutdown(&self) -> crate::Result<()> {
        self.holder.close()
    }
}

#[derive(Debug, Default)]
struct SharedState {
    open_users: usize,
    deferred_close: bool,
}

/// Several changesets may use the writer at once. The writer is opened by the first user
/// and closed when the last one leaves, unless a streaming load keeps it open.
pub struct SharedCommitPolicy {
    holder: Arc<WriterHolder>,
    state: Mutex<SharedState>,
}

impl SharedCommitPolicy {
    pub fn new(holder: Arc<WriterHolder>) -> SharedCommitPolicy {
        SharedCommitPolicy { holder, state: Mutex::new(SharedState::default()) }
    }

    pub fn open_users(&self) -> usize {
        self.state.lock().open_users
    }
}

impl CommitPolicy for SharedCommitPolicy {
    fn kind(&self) -> CommitPolicyKind {
        CommitPolicyKind::Shared
    }

    fn acquire_writer(&self) -> crate::Result<Arc<IndexWriter>> {
        let mut state = self.state.lock();
        let writer = self.holder.acquire_writer()?;
        state.open_users += 1;
        Ok(writer)
    }

    fn changeset_applied(&self, failed: bool, streaming: bool) -> crate::Result<()> {
        let mut state = self.state.lock();
        if state.open_users == 0 {
            return Err(WorkspaceError::InvariantViolation(format!(
                "changeset on '{}' completed without an acquired writer",
                self.holder.index_name()
            )));
        }
        state.open_users -= 1;
        debug!(
            "[{}] [changeset_applied] '{}' open_users: {}, failed: {}, streaming: {}",
            thread_name(),
            self.holder.index_name(),
            state.open_users,
            failed,
            streaming
        );
        if state.open_users == 0 {
            if failed {
                state.deferred_close = false;
                self.holder.force_release_lock()
            } else if !streaming || state.deferred_close {
                state.deferred_close = false;
                self.holder.close()
            } else {
                self.holder.commit_or_release().map(|_| ())
            }
        } else if !failed && !streaming {
            // Other users keep the writer, so it is rolled back rather than dropped.
            self.holder.commit_or_rollback().map(|_| ())
        } else {
            Ok(())
        }
    }

    fn flush(&self) -> crate::Result<()> {
        let mut state = self.state.lock();
        if state.open_users == 0 {
            self.holder.close()
        } else {
            state.deferred_close = true;
            self.holder.commit().map(|_| ())
        }
    }

    fn state(&self) -> PolicyState {
        let state = self.state.lock();
        if self.holder.is_open() {
            PolicyState::OpenShared(state.open_users)
        } else {
            PolicyState::Closed
        }
    }

    /// Closes the writer, or defers the close to the last user when changesets of other
    /// workspaces still use it.
    fn shutdown(&self) -> crate::Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Term;
    use crate::directory::ram_directory::tests::FlakyDirectory;
    use crate::directory::INDEX_WRITER_LOCK;
    use crate::index::Index;
    use crate::workspace::error_handler::LogErrorHandler;

    fn holder() -> Arc<WriterHolder> {
        Arc::new(WriterHolder::new("books", Index::create_in_ram(), Arc::new(LogErrorHandler)))
    }

    fn committed_contains(holder: &WriterHolder, id: &str) -> bool {
        holder.committed_snapshot().unwrap().contains(&Term::for_id(id))
    }

    #[test]
    fn test_exclusive_commits_non_streaming() {
        let holder = holder();
        let policy = ExclusiveCommitPolicy::new(holder.clone());
        assert_eq!(policy.state(), PolicyState::Closed);

        policy.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        policy.changeset_applied(false, true).unwrap();
        assert!(!committed_contains(&holder, "a"));
        assert_eq!(policy.state(), PolicyState::OpenExclusive);

        policy.acquire_writer().unwrap().add_document(doc!("b")).unwrap();
        policy.changeset_applied(false, false).unwrap();
        assert!(committed_contains(&holder, "a"));
        assert!(committed_contains(&holder, "b"));
        assert_eq!(policy.state(), PolicyState::OpenExclusive);

        policy.shutdown().unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
    }

    #[test]
    fn test_exclusive_failure_forces_release() {
        let holder = holder();
        let policy = ExclusiveCommitPolicy::new(holder.clone());
        policy.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        policy.changeset_applied(true, false).unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
        assert!(!holder.index().directory().is_locked(&INDEX_WRITER_LOCK));
        assert!(!committed_contains(&holder, "a"));
    }

    #[test]
    fn test_shared_closes_when_last_user_leaves() {
        let holder = holder();
        let policy = SharedCommitPolicy::new(holder.clone());
        let first = policy.acquire_writer().unwrap();
        let second = policy.acquire_writer().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(policy.state(), PolicyState::OpenShared(2));

        first.add_document(doc!("a")).unwrap();
        drop(first);
        policy.changeset_applied(false, false).unwrap();
        assert_eq!(policy.state(), PolicyState::OpenShared(1));
        assert!(committed_contains(&holder, "a"));

        second.add_document(doc!("b")).unwrap();
        drop(second);
        policy.changeset_applied(false, false).unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
        assert!(committed_contains(&holder, "b"));
        assert!(!holder.index().directory().is_locked(&INDEX_WRITER_LOCK));
    }

    #[test]
    fn test_shared_failure_at_zero_forces_release() {
        let holder = holder();
        let policy = SharedCommitPolicy::new(holder.clone());
        policy.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        policy.changeset_applied(true, false).unwrap();
        assert_eq!(policy.open_users(), 0);
        assert_eq!(policy.state(), PolicyState::Closed);
        assert!(!committed_contains(&holder, "a"));
        assert!(!holder.index().directory().is_locked(&INDEX_WRITER_LOCK));
    }

    #[test]
    fn test_shared_streaming_keeps_writer_until_flush() {
        let holder = holder();
        let policy = SharedCommitPolicy::new(holder.clone());
        policy.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        policy.changeset_applied(false, true).unwrap();
        assert_eq!(policy.state(), PolicyState::OpenShared(0));
        assert!(committed_contains(&holder, "a"));

        policy.flush().unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
    }

    #[test]
    fn test_shared_flush_with_users_defers_close() {
        let holder = holder();
        let policy = SharedCommitPolicy::new(holder.clone());
        policy.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        policy.flush().unwrap();
        assert!(committed_contains(&holder, "a"));
        assert_eq!(policy.state(), PolicyState::OpenShared(1));

        // Even a streaming changeset closes once a close was deferred.
        policy.changeset_applied(false, true).unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
    }

    #[test]
    fn test_shared_failed_commit_with_users_rolls_back() {
        let directory = FlakyDirectory::default();
        let index = Index::open_or_create(directory.clone()).unwrap();
        let holder = Arc::new(WriterHolder::new("books", index, Arc::new(LogErrorHandler)));
        let policy = SharedCommitPolicy::new(holder.clone());
        let writer = policy.acquire_writer().unwrap();
        policy.acquire_writer().unwrap();
        writer.add_document(doc!("ghost")).unwrap();

        directory.set_fail_writes(true);
        assert!(policy.changeset_applied(false, false).is_err());
        assert_eq!(policy.state(), PolicyState::OpenShared(1));
        assert!(!holder.open_nrt_snapshot(false).unwrap().contains(&Term::for_id("ghost")));

        directory.set_fail_writes(false);
        writer.add_document(doc!("kept")).unwrap();
        drop(writer);
        policy.changeset_applied(false, false).unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
        assert!(committed_contains(&holder, "kept"));
        assert!(!committed_contains(&holder, "ghost"));
    }

    #[test]
    fn test_shared_shutdown_waits_for_last_user() {
        let holder = holder();
        let policy = SharedCommitPolicy::new(holder.clone());
        policy.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        policy.shutdown().unwrap();
        assert_eq!(policy.state(), PolicyState::OpenShared(1));
        assert!(committed_contains(&holder, "a"));

        policy.changeset_applied(false, true).unwrap();
        assert_eq!(policy.state(), PolicyState::Closed);
    }

    #[test]
    fn test_exclusive_failed_commit_releases_writer() {
        let directory = FlakyDirectory::default();
        let index = Index::open_or_create(directory.clone()).unwrap();
        let holder = Arc::new(WriterHolder::new("books", index, Arc::new(LogErrorHandler)));
        let policy = ExclusiveCommitPolicy::new(holder.clone());
        policy.acquire_writer().unwrap().add_document(doc!("ghost")).unwrap();

        directory.set_fail_writes(true);
        assert!(policy.changeset_applied(false, false).is_err());
        assert_eq!(policy.state(), PolicyState::Closed);
        assert!(!holder.index().directory().is_locked(&INDEX_WRITER_LOCK));

        directory.set_fail_writes(false);
        policy.acquire_writer().unwrap().add_document(doc!("next")).unwrap();
        policy.changeset_applied(false, false).unwrap();
        assert!(committed_contains(&holder, "next"));
        assert!(!committed_contains(&holder, "ghost"));
    }

    #[test]
    fn test_shared_unbalanced_completion() {
        let policy = SharedCommitPolicy::new(holder());
        assert!(matches!(
            policy.changeset_applied(false, false),
            Err(WorkspaceError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_shared_acquire_failure_does_not_count() {
        let holder = holder();
        let _foreign_lock = holder.index().directory().acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        let policy = SharedCommitPolicy::new(holder);
        assert!(policy.acquire_writer().is_err());
        assert_eq!(policy.open_users(), 0);
    }
}
