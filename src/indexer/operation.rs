use std::fmt;

use serde::{Deserialize, Serialize};

use super::flush_strategy::{flush_effect, FlushEffect};
use super::index_writer::IndexWriter;
use crate::core::{Document, Query, Term};

/// Timestamped Delete operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteOperation {
    pub opstamp: crate::Opstamp,
    pub target: Query,
}

/// Discriminant of [`Operation`], used in logs and error contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Update,
    Delete,
    Optimize,
    PurgeAll,
    Flush,
    DeleteByQuery,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Add => "add",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Optimize => "optimize",
            OperationKind::PurgeAll => "purge_all",
            OperationKind::Flush => "flush",
            OperationKind::DeleteByQuery => "delete_by_query",
        };
        f.write_str(name)
    }
}

/// One mutation of the index. Each variant carries exactly what it needs to apply itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Adds a document.
    Add(Document),
    /// Deletes the documents matching `term`, then adds `document`.
    Update { term: Term, document: Document },
    /// Deletes the documents matching a term.
    Delete(Term),
    /// Merges the index and expunges deleted documents.
    Optimize,
    /// Deletes every document.
    PurgeAll,
    /// Requests a durable flush through the commit policy.
    Flush,
    DeleteByQuery(Query),
}

impl Operation {
    /// Update keyed on the document id.
    pub fn update(document: Document) -> Operation {
        Operation::Update { term: document.id_term(), document }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Add(_) => OperationKind::Add,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
            Operation::Optimize => OperationKind::Optimize,
            Operation::PurgeAll => OperationKind::PurgeAll,
            Operation::Flush => OperationKind::Flush,
            Operation::DeleteByQuery(_) => OperationKind::DeleteByQuery,
        }
    }

    /// Staleness flags this operation raises once applied.
    pub fn flush_effect(&self) -> FlushEffect {
        flush_effect(self.kind())
    }

    /// Applies the operation to the writer.
    ///
    /// `Flush` is a no-op here: the workspace routes it to the commit policy
    /// once the write lock of the changeset has been released.
    pub(crate) fn apply(&self, writer: &IndexWriter) -> crate::Result<()> {
        match self {
            Operation::Add(document) => writer.add_document(document.clone()).map(|_| ()),
            Operation::Update { term, document } => {
                writer.update_document(term.clone(), document.clone()).map(|_| ())
            }
            Operation::Delete(term) => writer.delete_term(term.clone()).map(|_| ()),
            Operation::Optimize => writer.force_merge(),
            Operation::PurgeAll => writer.delete_all_documents().map(|_| ()),
            Operation::Flush => Ok(()),
            Operation::DeleteByQuery(query) => writer.delete_by_query(query.clone()).map(|_| ()),
        }
    }
}
