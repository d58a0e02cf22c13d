mod commit_policy;
mod error_handler;
mod generation;
mod nrt_commit_policy;
mod reader_provider;
#[allow(clippy::module_inception)]
mod workspace;
mod writer_holder;

pub use self::commit_policy::{
    new_commit_policy, CommitPolicy, ExclusiveCommitPolicy, PolicyState, SharedCommitPolicy,
};
pub use self::error_handler::{ErrorContext, ErrorHandler, ErrorPhase, LogErrorHandler};
pub use self::generation::GenerationTracker;
pub use self::nrt_commit_policy::NrtCommitPolicy;
pub use self::reader_provider::{snapshot_source_for, CommittedSnapshotSource, NrtSnapshotSource};
pub use self::workspace::Workspace;
pub use self::writer_holder::WriterHolder;
