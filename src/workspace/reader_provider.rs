use std::sync::Arc;

use super::writer_holder::WriterHolder;
use crate::config::CommitPolicyKind;
use crate::reader::{Snapshot, SnapshotSource};

/// Opens snapshots from the writer, uncommitted changes included.
pub struct NrtSnapshotSource {
    holder: Arc<WriterHolder>,
}

impl SnapshotSource for NrtSnapshotSource {
    fn open_snapshot(&self, apply_deletes: bool) -> crate::Result<Snapshot> {
        self.holder.open_nrt_snapshot(apply_deletes)
    }
}

/// Opens snapshots of the last durable commit. Deletes are always applied at commit.
pub struct CommittedSnapshotSource {
    holder: Arc<WriterHolder>,
}

impl SnapshotSource for CommittedSnapshotSource {
    fn open_snapshot(&self, _apply_deletes: bool) -> crate::Result<Snapshot> {
        self.holder.committed_snapshot()
    }
}

/// NRT workspaces read the writer; the others only read what was committed.
pub fn snapshot_source_for(kind: CommitPolicyKind, holder: Arc<WriterHolder>) -> Arc<dyn SnapshotSource> {
    match kind {
        CommitPolicyKind::Nrt => Arc::new(NrtSnapshotSource { holder }),
        CommitPolicyKind::Exclusive | CommitPolicyKind::Shared => {
            Arc::new(CommittedSnapshotSource { holder })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Term;
    use crate::index::Index;
    use crate::workspace::error_handler::LogErrorHandler;

    #[test]
    fn test_sources_by_policy() {
        let holder =
            Arc::new(WriterHolder::new("books", Index::create_in_ram(), Arc::new(LogErrorHandler)));
        holder.acquire_writer().unwrap().add_document(doc!("a")).unwrap();
        let nrt = snapshot_source_for(CommitPolicyKind::Nrt, holder.clone());
        let committed = snapshot_source_for(CommitPolicyKind::Shared, holder.clone());
        assert!(nrt.open_snapshot(false).unwrap().contains(&Term::for_id("a")));
        assert!(!committed.open_snapshot(true).unwrap().contains(&Term::for_id("a")));
    }
}
