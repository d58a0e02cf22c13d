//! Index workspace coordination.
//!
//! Manages the writer lifecycle of a full-text index, publishes near-real-time reader
//! snapshots while changesets keep mutating it, and sequences changeset application
//! through a bounded per-index queue.
//!
//! The layering, leaves first:
//! - [`directory`]: storage abstraction and exclusive locks.
//! - [`index`] / [`indexer`]: the storage engine (`IndexWriter`, operations, changesets).
//! - [`reader`]: snapshots, reference-counted handles and the refresh algorithm.
//! - [`workspace`]: writer holder, commit policies and generation tracking.
//! - [`sequencer`]: the bounded FIFO that feeds one workspace from one thread.
//! - [`api`]: per-index backends and the process-wide registry.

#[macro_use]
mod macros;

pub mod api;
pub mod common;
pub mod config;
pub mod core;
pub mod directory;
pub mod future_result;
pub mod index;
pub mod indexer;
pub mod reader;
pub mod sequencer;
pub mod workspace;

use std::path::Path;

use once_cell::sync::Lazy;

pub use crate::api::{IndexBackend, IndexManager};
pub use crate::common::errors::WorkspaceError;
pub use crate::config::{CommitPolicyKind, WorkspaceConfig};
pub use crate::core::{Document, Query, Term};
pub use crate::indexer::{Changeset, Operation, OperationKind};
pub use crate::reader::{ReaderHandle, Snapshot};

/// A u64 assigned to every operation applied by the index writer.
pub type Opstamp = u64;

/// Identifier of a reader generation. See [`workspace::GenerationTracker`].
pub type Generation = u64;

/// `index_workspace` result type.
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Index meta file, holding the last durable commit.
pub static META_FILEPATH: Lazy<&'static Path> = Lazy::new(|| Path::new("meta.json"));

/// Persisted workspace configuration.
pub static WORKSPACE_CONFIG_FILEPATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new("workspace_config.json"));
