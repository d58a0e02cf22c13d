use std::sync::Arc;

use log::info;
use validator::Validate;

use crate::common::thread_name;
use crate::config::WorkspaceConfig;
use crate::future_result::FutureResult;
use crate::index::Index;
use crate::indexer::{Changeset, Operation};
use crate::reader::ReaderHandle;
use crate::sequencer::AsyncSequencer;
use crate::workspace::{ErrorHandler, LogErrorHandler, PolicyState, Workspace};

/// One index, served: changesets go through its sequencer, readers come from its workspace.
pub struct IndexBackend {
    config: WorkspaceConfig,
    workspace: Arc<Workspace>,
    sequencer: AsyncSequencer<Workspace>,
}

impl IndexBackend {
    pub fn open(index: Index, config: WorkspaceConfig) -> crate::Result<IndexBackend> {
        IndexBackend::open_with_error_handler(index, config, Arc::new(LogErrorHandler))
    }

    pub fn open_with_error_handler(
        index: Index,
        config: WorkspaceConfig,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> crate::Result<IndexBackend> {
        config.validate()?;
        let workspace = Arc::new(Workspace::with_error_handler(index, &config, error_handler));
        let sequencer =
            AsyncSequencer::start(&config.index_name, config.queue_max_len, workspace.clone())?;
        info!("[{}] [IndexBackend::open] '{}' ready", thread_name(), config.index_name);
        Ok(IndexBackend { config, workspace, sequencer })
    }

    pub fn index_name(&self) -> &str {
        &self.config.index_name
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    /// Queues `changeset`; blocks while the queue is full.
    pub fn submit(&self, changeset: Changeset) -> FutureResult<()> {
        self.sequencer.submit(changeset)
    }

    pub fn queue_len(&self) -> usize {
        self.sequencer.queue_len()
    }

    pub fn open_index_reader(&self) -> crate::Result<Arc<ReaderHandle>> {
        self.workspace.open_index_reader()
    }

    pub fn current_index_reader(&self) -> crate::Result<Arc<ReaderHandle>> {
        self.workspace.current_index_reader()
    }

    pub fn close_index_reader(&self, handle: &ReaderHandle) -> crate::Result<()> {
        self.workspace.close_index_reader(handle)
    }

    /// Durable flush, ordered after every changeset submitted so far.
    pub fn flush(&self) -> crate::Result<()> {
        self.sequencer.submit(Changeset::new(vec![Operation::Flush])).wait()
    }

    pub fn policy_state(&self) -> PolicyState {
        self.workspace.policy_state()
    }

    /// Drains the queue, closes the writer, then the readers.
    pub fn shutdown(&self) -> crate::Result<()> {
        self.sequencer.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::config::CommitPolicyKind;
    use crate::core::Term;
    use crate::WorkspaceError;

    fn backend(kind: CommitPolicyKind) -> IndexBackend {
        let config = WorkspaceConfig::builder().index_name("books").commit_policy(kind).build();
        IndexBackend::open(Index::create_in_ram(), config).unwrap()
    }

    #[test]
    fn test_submit_and_read() {
        let backend = backend(CommitPolicyKind::Exclusive);
        backend.submit(Changeset::new(vec![Operation::Add(doc!("doc1"))])).wait().unwrap();
        let handle = backend.open_index_reader().unwrap();
        assert!(handle.snapshot().unwrap().contains(&Term::for_id("doc1")));
        backend.close_index_reader(&handle).unwrap();
        assert_eq!(backend.queue_len(), 0);
    }

    #[test]
    fn test_concurrent_submitters_and_readers() {
        let backend = Arc::new(backend(CommitPolicyKind::Nrt));
        let submitters: Vec<_> = (0..4)
            .map(|t| {
                let backend = backend.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let changeset =
                            Changeset::new(vec![Operation::Add(doc!(format!("doc-{t}-{i}")))]);
                        backend.submit(changeset).wait().unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let backend = backend.clone();
                thread::spawn(move || {
                    let mut last_num_docs = 0;
                    for _ in 0..50 {
                        let handle = backend.open_index_reader().unwrap();
                        assert!(handle.ref_count() > 0);
                        let num_docs = handle.snapshot().unwrap().num_docs();
                        assert!(num_docs >= last_num_docs);
                        last_num_docs = num_docs;
                        backend.close_index_reader(&handle).unwrap();
                    }
                })
            })
            .collect();
        for worker in submitters.into_iter().chain(readers) {
            worker.join().unwrap();
        }
        let handle = backend.open_index_reader().unwrap();
        assert_eq!(handle.snapshot().unwrap().num_docs(), 100);
        backend.close_index_reader(&handle).unwrap();
    }

    #[test]
    fn test_flush_and_shutdown() {
        let backend = backend(CommitPolicyKind::Nrt);
        backend.submit(Changeset::streaming(vec![Operation::Add(doc!("a"))])).wait().unwrap();
        backend.flush().unwrap();
        let index = backend.workspace().writer_holder().index().clone();
        assert!(index.committed_snapshot().unwrap().contains(&Term::for_id("a")));

        backend.shutdown().unwrap();
        assert_eq!(backend.policy_state(), PolicyState::Closed);
        assert!(matches!(
            backend.submit(Changeset::new(vec![Operation::Add(doc!("b"))])).wait(),
            Err(WorkspaceError::InvariantViolation(_))
        ));
        assert!(matches!(backend.open_index_reader(), Err(WorkspaceError::InvariantViolation(_))));
    }

    #[test]
    fn test_invalid_config() {
        let config = WorkspaceConfig::builder().index_name("books").queue_max_len(0).build();
        assert!(matches!(
            IndexBackend::open(Index::create_in_ram(), config),
            Err(WorkspaceError::InvalidArgument(_))
        ));
    }
}
