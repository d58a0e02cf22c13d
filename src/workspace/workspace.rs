use std::sync::Arc;

use log::{debug, info};

use super::commit_policy::{new_commit_policy, CommitPolicy, PolicyState};
use super::error_handler::{ErrorContext, ErrorHandler, ErrorPhase, LogErrorHandler};
use super::generation::GenerationTracker;
use super::reader_provider::snapshot_source_for;
use super::writer_holder::WriterHolder;
use crate::common::thread_name;
use crate::config::{CommitPolicyKind, WorkspaceConfig};
use crate::directory::Directory;
use crate::index::Index;
use crate::indexer::{Changeset, FlushEffect};
use crate::reader::{ReaderHandle, ReaderManager};
use crate::sequencer::ChangesetProcessor;
use crate::WorkspaceError;

/// Everything one index needs to apply changesets and serve readers.
///
/// `apply_changeset` must only be called from one thread at a time, which the
/// [`AsyncSequencer`](crate::sequencer::AsyncSequencer) guarantees. Readers can be
/// requested from any thread.
pub struct Workspace {
    index_name: String,
    holder: Arc<WriterHolder>,
    policy: Arc<dyn CommitPolicy>,
    generations: Arc<GenerationTracker>,
    readers: ReaderManager,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Workspace {
    pub fn new(index: Index, config: &WorkspaceConfig) -> Workspace {
        Workspace::with_error_handler(index, config, Arc::new(LogErrorHandler))
    }

    pub fn with_error_handler(
        index: Index,
        config: &WorkspaceConfig,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Workspace {
        let holder = Arc::new(WriterHolder::new(&config.index_name, index, error_handler.clone()));
        let policy = new_commit_policy(config.commit_policy, holder.clone());
        Workspace::with_shared_writer(&config.index_name, holder, policy, error_handler)
    }

    /// Builds a workspace on a writer which other workspaces may use too.
    ///
    /// Workspaces built from the same `holder` and `policy` multiplex one physical writer;
    /// with a [`SharedCommitPolicy`](super::SharedCommitPolicy) the writer stays open while
    /// any of them has a changeset in flight. Each workspace keeps its own readers and
    /// generations.
    pub fn with_shared_writer(
        index_name: &str,
        holder: Arc<WriterHolder>,
        policy: Arc<dyn CommitPolicy>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Workspace {
        let generations = Arc::new(GenerationTracker::new());
        let readers = ReaderManager::new(
            index_name,
            snapshot_source_for(policy.kind(), holder.clone()),
            generations.clone(),
        );
        info!(
            "[{}] [Workspace::new] '{}' with {} commit policy",
            thread_name(),
            index_name,
            policy.kind()
        );
        Workspace {
            index_name: index_name.to_string(),
            holder,
            policy,
            generations,
            readers,
            error_handler,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn commit_policy(&self) -> CommitPolicyKind {
        self.policy.kind()
    }

    pub fn policy_state(&self) -> PolicyState {
        self.policy.state()
    }

    pub fn generations(&self) -> &GenerationTracker {
        &self.generations
    }

    pub fn writer_holder(&self) -> &WriterHolder {
        &self.holder
    }

    /// Applies every operation of `changeset` in order, then lets the commit policy decide
    /// what to do with the writer.
    ///
    /// On the first failing operation the uncommitted state of the writer is rolled back
    /// before anyone can open a snapshot of it, and the remaining operations are skipped.
    pub fn apply_changeset(&self, changeset: &Changeset) -> crate::Result<()> {
        let writer = match self.policy.acquire_writer() {
            Ok(writer) => writer,
            Err(err) => {
                self.report(ErrorPhase::AcquireWriter, &err);
                if err.is_writer_failure() {
                    let _ = self.holder.force_release_lock();
                }
                return Err(err);
            }
        };

        let mut effect = FlushEffect::NONE;
        let mut failure: Option<WorkspaceError> = None;
        {
            let _guard = self.holder.write_lock();
            for operation in changeset.operations() {
                if let Err(err) = operation.apply(&writer) {
                    self.report(ErrorPhase::ApplyOperation(operation.kind()), &err);
                    let _ = self.holder.rollback_unlocked(&writer);
                    failure = Some(err);
                    break;
                }
                effect |= operation.flush_effect();
            }
        }
        drop(writer);

        if failure.is_none() && changeset.requests_flush() {
            if let Err(err) = self.policy.flush() {
                self.report(ErrorPhase::Flush, &err);
                let _ = self.holder.rollback();
                failure = Some(err);
            }
        }

        let failed = failure.is_some();
        let policy_result = self.policy.changeset_applied(failed, changeset.is_streaming());

        if failed || policy_result.is_err() {
            // Readers may have seen state that is now discarded.
            self.generations.raise(FlushEffect::WRITES_AND_DELETES);
            self.generations.fold_pending();
        } else {
            self.generations.raise(effect);
            if !changeset.is_streaming() || changeset.requests_flush() {
                if let Some(generation) = self.generations.fold_pending() {
                    debug!(
                        "[{}] [apply_changeset] '{}' requires generation {}",
                        thread_name(),
                        self.index_name,
                        generation
                    );
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => policy_result,
        }
    }

    /// Makes everything applied so far durable and visible to the next reader request,
    /// streaming changesets included.
    pub fn flush(&self) -> crate::Result<()> {
        let result = self.policy.flush();
        if let Err(err) = &result {
            self.report(ErrorPhase::Flush, err);
        }
        self.generations.fold_pending();
        result
    }

    /// See [`ReaderManager::open_index_reader`].
    pub fn open_index_reader(&self) -> crate::Result<Arc<ReaderHandle>> {
        self.readers.open_index_reader()
    }

    /// See [`ReaderManager::current_index_reader`].
    pub fn current_index_reader(&self) -> crate::Result<Arc<ReaderHandle>> {
        self.readers.current_index_reader()
    }

    pub fn close_index_reader(&self, handle: &ReaderHandle) -> crate::Result<()> {
        self.readers.close_index_reader(handle)
    }

    /// Copies the committed index files while no changeset is being applied.
    pub fn copy_to(&self, target: &dyn Directory) -> crate::Result<usize> {
        self.holder.copy_to(target)
    }

    /// Closes the writer, then the readers. Generation tracking starts over afterwards.
    pub fn shutdown(&self) -> crate::Result<()> {
        let result = self.policy.shutdown();
        self.readers.shutdown();
        self.generations.reset();
        info!("[{}] [shutdown] workspace '{}' shut down", thread_name(), self.index_name);
        result
    }

    fn report(&self, phase: ErrorPhase, error: &WorkspaceError) {
        self.error_handler.handle(ErrorContext::new(&self.index_name, phase), error);
    }
}

impl ChangesetProcessor for Workspace {
    fn apply_changeset(&self, changeset: &Changeset) -> crate::Result<()> {
        Workspace::apply_changeset(self, changeset)
    }

    fn shutdown(&self) -> crate::Result<()> {
        Workspace::shutdown(self)
    }
}
