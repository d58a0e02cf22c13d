use super::Snapshot;

/// Where a [`ReaderManager`](super::ReaderManager) opens its snapshots from.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Opens a new snapshot. With `apply_deletes` the pending deletes of the writer are
    /// applied first, so documents deleted so far are not visible.
    fn open_snapshot(&self, apply_deletes: bool) -> crate::Result<Snapshot>;

    /// Releases a snapshot whose last handle reference went away.
    fn release_snapshot(&self, snapshot: Snapshot) -> crate::Result<()> {
        drop(snapshot);
        Ok(())
    }
}
