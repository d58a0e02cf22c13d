use std::sync::Arc;

use super::commit_policy::{CommitPolicy, PolicyState};
use super::writer_holder::WriterHolder;
use crate::config::CommitPolicyKind;
use crate::indexer::IndexWriter;

/// Keeps the writer open for the lifetime of the workspace; readers see its uncommitted
/// state through NRT snapshots. Only an explicit flush commits.
pub struct NrtCommitPolicy {
    holder: Arc<WriterHolder>,
}

impl NrtCommitPolicy {
    pub fn new(holder: Arc<WriterHolder>) -> NrtCommitPolicy {
        NrtCommitPolicy { holder }
    }
}

impl CommitPolicy for NrtCommitPolicy {
    fn kind(&self) -> CommitPolicyKind {
        CommitPolicyKind::Nrt
    }

    fn acquire_writer(&self) -> crate::Result<Arc<IndexWriter>> {
        self.holder.acquire_writer()
    }

    fn changeset_applied(&self, failed: bool, _streaming: bool) -> crate::Result<()> {
        if failed {
            return self.holder.force_release_lock();
        }
        Ok(())
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
