use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use super::{Snapshot, SnapshotSource};
use crate::common::thread_name;
use crate::{Generation, WorkspaceError};

/// A reference-counted [`Snapshot`] handed out to readers.
///
/// The manager owns one reference while the handle is published. Each reader that obtained
/// the handle owns one more and must give it back with [`ReaderHandle::dec_ref`], usually
/// through `close_index_reader`. When the count reaches zero the snapshot is released to its
/// source and the handle can never be acquired again.
pub struct ReaderHandle {
    generation: Generation,
    ref_count: AtomicUsize,
    snapshot: RwLock<Option<Snapshot>>,
    source: Arc<dyn SnapshotSource>,
}

impl ReaderHandle {
    pub(crate) fn new(
        snapshot: Snapshot,
        generation: Generation,
        source: Arc<dyn SnapshotSource>,
    ) -> Arc<ReaderHandle> {
        Arc::new(ReaderHandle {
            generation,
            ref_count: AtomicUsize::new(1),
            snapshot: RwLock::new(Some(snapshot)),
            source,
        })
    }

    /// Reader generation this handle was opened for.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.ref_count() > 0
    }

    /// Increments the count, unless it already reached zero.
    pub(crate) fn try_inc_ref(&self) -> bool {
        let mut current = self.ref_count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.ref_count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Takes one more reference on a handle the caller already holds.
    pub fn inc_ref(&self) -> crate::Result<()> {
        if self.try_inc_ref() {
            Ok(())
        } else {
            Err(WorkspaceError::InvariantViolation(format!(
                "reader handle of generation {} is already closed",
                self.generation
            )))
        }
    }

    /// Gives one reference back. The last one releases the snapshot.
    pub fn dec_ref(&self) -> crate::Result<()> {
        let mut current = self.ref_count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(WorkspaceError::InvariantViolation(format!(
                    "reader handle of generation {} closed more often than opened",
                    self.generation
                )));
            }
            match self.ref_count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(1) => {
                    self.release();
                    return Ok(());
                }
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self) {
        let snapshot = self.snapshot.write().take();
        if let Some(snapshot) = snapshot {
            debug!(
                "[{}] [release] releasing snapshot {} of generation {}",
                thread_name(),
                snapshot.snapshot_id(),
                self.generation
            );
            if let Err(err) = self.source.release_snapshot(snapshot) {
                warn!(
                    "[{}] [release] failed to release snapshot of generation {}: {}",
                    thread_name(),
                    self.generation,
                    err
                );
            }
        }
    }

    /// The snapshot behind this handle.
    ///
    /// Fails once the handle has been released.
    pub fn snapshot(&self) -> crate::Result<Snapshot> {
        self.snapshot.read().clone().ok_or_else(|| {
            WorkspaceError::InvariantViolation(format!(
                "reader handle of generation {} is already closed",
                self.generation
            ))
        })
    }
}

impl fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("generation", &self.generation)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
