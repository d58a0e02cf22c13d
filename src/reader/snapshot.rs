use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use census::{Inventory, TrackedObject};

use crate::core::{Document, Query, Term};
use crate::Opstamp;

/// Identifies one opened snapshot.
///
/// Every live [`Snapshot`] keeps its `SnapshotMeta` registered in the index's
/// [`SnapshotInventory`], which makes leaked snapshots observable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotMeta {
    pub snapshot_id: u64,
    /// Opstamp of the last operation visible in the snapshot.
    pub opstamp: Opstamp,
    /// Whether pending deletes were applied before opening.
    pub deletes_applied: bool,
}

/// Inventory of the snapshots currently alive for one index.
#[derive(Clone, Default)]
pub(crate) struct SnapshotInventory {
    inventory: Inventory<SnapshotMeta>,
    next_snapshot_id: Arc<AtomicU64>,
}

impl SnapshotInventory {
    /// Returns the metas of all alive snapshots.
    pub fn all(&self) -> Vec<SnapshotMeta> {
        self.inventory.list().iter().map(|tracked| SnapshotMeta::clone(tracked)).collect()
    }

    pub fn new_snapshot(
        &self,
        documents: Vec<Arc<Document>>,
        opstamp: Opstamp,
        deletes_applied: bool,
    ) -> Snapshot {
        let snapshot_id = self.next_snapshot_id.fetch_add(1, Ordering::Relaxed);
        let meta = self.inventory.track(SnapshotMeta { snapshot_id, opstamp, deletes_applied });
        Snapshot { inner: Arc::new(SnapshotInner { documents, meta }) }
    }
}

struct SnapshotInner {
    documents: Vec<Arc<Document>>,
    meta: TrackedObject<SnapshotMeta>,
}

/// Immutable point-in-time view of the index.
///
/// Cloning is cheap and shares the underlying view.
#[derive(Clone)]
pub struct Snapshot {
    inner: Arc<SnapshotInner>,
}

impl Snapshot {
    pub fn meta(&self) -> &SnapshotMeta {
        &self.inner.meta
    }

    pub fn snapshot_id(&self) -> u64 {
        self.inner.meta.snapshot_id
    }

    pub fn num_docs(&self) -> usize {
        self.inner.documents.len()
    }

    /// Number of documents matching `term`.
    pub fn doc_freq(&self, term: &Term) -> usize {
        self.inner.documents.iter().filter(|document| document.matches_term(term)).count()
    }

    pub fn contains(&self, term: &Term) -> bool {
        self.inner.documents.iter().any(|document| document.matches_term(term))
    }

    /// Returns the first document whose id is `id`.
    pub fn document(&self, id: &str) -> Option<&Document> {
        self.inner.documents.iter().map(Arc::as_ref).find(|document| document.id() == id)
    }

    pub fn search(&self, query: &Query) -> Vec<&Document> {
        self.inner
            .documents
            .iter()
            .map(Arc::as_ref)
            .filter(|document| query.matches(document))
            .collect()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snapshot(id={}, opstamp={}, num_docs={})",
            self.snapshot_id(),
            self.inner.meta.opstamp,
            self.num_docs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lookups() {
        let inventory = SnapshotInventory::default();
        let documents = vec![
            Arc::new(doc!("a", "lang" => "en")),
            Arc::new(doc!("b", "lang" => "en")),
            Arc::new(doc!("c", "lang" => "fr")),
        ];
        let snapshot = inventory.new_snapshot(documents, 3, true);
        assert_eq!(snapshot.num_docs(), 3);
        assert_eq!(snapshot.doc_freq(&Term::new("lang", "en")), 2);
        assert!(snapshot.contains(&Term::for_id("c")));
        assert_eq!(snapshot.document("b").map(|d| d.id()), Some("b"));
        assert_eq!(snapshot.search(&Query::Term(Term::new("lang", "fr"))).len(), 1);
    }

    #[test]
    fn test_inventory_tracks_live_snapshots() {
        let inventory = SnapshotInventory::default();
        let first = inventory.new_snapshot(Vec::new(), 0, false);
        let second = inventory.new_snapshot(Vec::new(), 1, true);
        assert_ne!(first.snapshot_id(), second.snapshot_id());
        let first_clone = first.clone();
        drop(first);
        assert_eq!(inventory.all().len(), 2);
        drop(first_clone);
        drop(second);
        assert!(inventory.all().is_empty());
    }
}
