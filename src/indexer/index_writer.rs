use std::sync::Arc;
use std::thread;

use log::{debug, info, trace};
use parking_lot::Mutex;

use super::operation::DeleteOperation;
use super::stamper::Stamper;
use crate::common::errors::WorkspaceError;
use crate::core::{Document, Query, Term};
use crate::directory::DirectoryLock;
use crate::index::{save_metas, Index, IndexMeta};
use crate::reader::Snapshot;
use crate::Opstamp;

/// A document together with the opstamp of the operation that added it.
#[derive(Clone)]
struct StampedDocument {
    opstamp: Opstamp,
    document: Arc<Document>,
}

#[derive(Default)]
struct WriterState {
    /// Documents added so far, in opstamp order. Deleted ones stay here until
    /// the pending deletes are applied.
    documents: Vec<StampedDocument>,
    /// Deletes recorded but not yet applied to `documents`.
    pending_deletes: Vec<DeleteOperation>,
    /// Opstamp of the last durable commit.
    committed_opstamp: Opstamp,
    /// Whether something happened since the last commit.
    dirty: bool,
}

impl WriterState {
    fn from_metas(metas: IndexMeta) -> WriterState {
        let opstamp = metas.opstamp;
        WriterState {
            documents: metas
                .documents
                .into_iter()
                .map(|document| StampedDocument { opstamp, document: Arc::new(document) })
                .collect(),
            pending_deletes: Vec::new(),
            committed_opstamp: opstamp,
            dirty: false,
        }
    }

    /// A delete only removes documents added before it.
    fn apply_pending_deletes(&mut self) -> usize {
        if self.pending_deletes.is_empty() {
            return 0;
        }
        let deletes = std::mem::take(&mut self.pending_deletes);
        let num_docs_before = self.documents.len();
        self.documents.retain(|stamped| {
            !deletes.iter().any(|delete| {
                stamped.opstamp < delete.opstamp && delete.target.matches(&stamped.document)
            })
        });
        num_docs_before - self.documents.len()
    }

    fn visible_documents(&self) -> Vec<Arc<Document>> {
        self.documents.iter().map(|stamped| stamped.document.clone()).collect()
    }
}

/// `IndexWriter` is the single writer of an [`Index`].
///
/// Added documents are visible to the next NRT snapshot right away. Deletes are only
/// recorded, and become visible once applied: by a snapshot opened with
/// `apply_deletes`, by [`IndexWriter::force_merge`] or by a commit.
///
/// All methods take `&self`; the state sits behind a mutex so that reader threads can open
/// snapshots while the consumer thread keeps writing.
pub struct IndexWriter {
    // the lock is just used to bind the lifetime of the lock with that of the IndexWriter.
    _directory_lock: Option<DirectoryLock>,

    index: Index,

    stamper: Stamper,

    state: Mutex<WriterState>,
}

impl IndexWriter {
    pub(crate) fn new(index: &Index, directory_lock: DirectoryLock) -> crate::Result<Self> {
        let metas = index.load_metas()?;
        let stamper = Stamper::new(metas.opstamp + 1);
        info!(
            "[{}] [IndexWriter::new] opened writer at opstamp {} with {} documents",
            thread::current().name().unwrap_or_default(),
            metas.opstamp,
            metas.documents.len()
        );
        Ok(IndexWriter {
            _directory_lock: Some(directory_lock),
            index: index.clone(),
            stamper,
            state: Mutex::new(WriterState::from_metas(metas)),
        })
    }

    /// Accessor to the index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Adds a document.
    ///
    /// The opstamp is an increasing `u64` that can
    /// be used by the client to align commits with its own
    /// document queue.
    pub fn add_document(&self, document: Document) -> crate::Result<Opstamp> {
        if document.id().is_empty() {
            return Err(WorkspaceError::InvalidArgument("document id must not be empty".to_string()));
        }
        let mut state = self.state.lock();
        let opstamp = self.stamper.stamp();
        trace!("[add_document] id: {}, opstamp: {}", document.id(), opstamp);
        state.documents.push(StampedDocument { opstamp, document: Arc::new(document) });
        state.dirty = true;
        Ok(opstamp)
    }

    /// Deletes the documents matching `term`, then adds `document`.
    ///
    /// Until the deletes are applied, a snapshot sees both versions.
    pub fn update_document(&self, term: Term, document: Document) -> crate::Result<Opstamp> {
        if document.id().is_empty() {
            return Err(WorkspaceError::InvalidArgument("document id must not be empty".to_string()));
        }
        let mut state = self.state.lock();
        let stamps = self.stamper.stamps(2);
        state.pending_deletes.push(DeleteOperation { opstamp: stamps.start, target: Query::Term(term) });
        let opstamp = stamps.start + 1;
        state.documents.push(StampedDocument { opstamp, document: Arc::new(document) });
        state.dirty = true;
        Ok(opstamp)
    }

    /// Records the deletion of every document matching `term`.
    pub fn delete_term(&self, term: Term) -> crate::Result<Opstamp> {
        self.delete_by_query(Query::Term(term))
    }

    /// Records the deletion of every document matching `query`.
    pub fn delete_by_query(&self, query: Query) -> crate::Result<Opstamp> {
        let mut state = self.state.lock();
        let opstamp = self.stamper.stamp();
        trace!("[delete_by_query] query: {}, opstamp: {}", query, opstamp);
        state.pending_deletes.push(DeleteOperation { opstamp, target: query });
        state.dirty = true;
        Ok(opstamp)
    }

    /// Records the deletion of all documents added so far.
    pub fn delete_all_documents(&self) -> crate::Result<Opstamp> {
        self.delete_by_query(Query::MatchAll)
    }

    /// Applies the pending deletes and compacts the documents.
    pub fn force_merge(&self) -> crate::Result<()> {
        let mut state = self.state.lock();
        let num_deleted = state.apply_pending_deletes();
        state.documents.shrink_to_fit();
        debug!("[force_merge] expunged {} documents", num_deleted);
        Ok(())
    }

    /// Opens a near-real-time snapshot of the writer state, without committing.
    ///
    /// With `apply_deletes` false the snapshot may still show documents whose
    /// deletion is pending.
    pub fn nrt_snapshot(&self, apply_deletes: bool) -> Snapshot {
        let mut state = self.state.lock();
        if apply_deletes {
            state.apply_pending_deletes();
        }
        let opstamp = self.stamper.peek().saturating_sub(1);
        self.index.snapshot_inventory().new_snapshot(
            state.visible_documents(),
            opstamp,
            apply_deletes || state.pending_deletes.is_empty(),
        )
    }

    /// Commits all of the pending changes
    ///
    /// A call to commit blocks.
    /// After it returns, all of the document that
    /// were added since the last commit are published
    /// and persisted.
    ///
    /// Commit returns the `opstamp` of the last operation
    /// that made it in the commit.
    pub fn commit(&self) -> crate::Result<Opstamp> {
        self.commit_with_payload(None)
    }

    /// Same as [`IndexWriter::commit`], storing `payload` in the meta file.
    pub fn commit_with_payload(&self, payload: Option<String>) -> crate::Result<Opstamp> {
        let mut state = self.state.lock();
        state.apply_pending_deletes();
        let opstamp = self.stamper.stamp();
        let metas = IndexMeta {
            documents: state.documents.iter().map(|stamped| stamped.document.as_ref().clone()).collect(),
            opstamp,
            payload,
        };
        save_metas(&metas, self.index.directory())?;
        state.committed_opstamp = opstamp;
        state.dirty = false;
        info!(
            "[{}] [commit] committed {} documents at opstamp {}",
            thread::current().name().unwrap_or_default(),
            metas.documents.len(),
            opstamp
        );
        Ok(opstamp)
    }

    /// Rollback to the last commit
    ///
    /// This cancels all of the updates that
    /// happened after the last commit.
    /// After calling rollback, the index is in the same
    /// state as it was after the last commit.
    ///
    /// The opstamp at the last commit is returned.
    pub fn rollback(&self) -> crate::Result<Opstamp> {
        let metas = self.index.load_metas()?;
        let mut state = self.state.lock();
        info!("Rolling back to opstamp {}", metas.opstamp);
        *state = WriterState::from_metas(metas);
        Ok(state.committed_opstamp)
    }

    /// Returns the opstamp of the last successful commit.
    pub fn commit_opstamp(&self) -> Opstamp {
        self.state.lock().committed_opstamp
    }

    /// Whether some operation was applied since the last commit.
    pub fn has_uncommitted_changes(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn num_pending_deletes(&self) -> usize {
        self.state.lock().pending_deletes.len()
    }
}
