mod async_sequencer;

pub use self::async_sequencer::AsyncSequencer;
use crate::indexer::Changeset;

/// Applies the changesets taken off a sequencer queue, one at a time.
pub trait ChangesetProcessor: Send + Sync + 'static {
    fn apply_changeset(&self, changeset: &Changeset) -> crate::Result<()>;

    /// Called once, after the last queued changeset was applied.
    fn shutdown(&self) -> crate::Result<()>;
}
