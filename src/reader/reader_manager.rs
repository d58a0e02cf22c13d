use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::{ReaderHandle, SnapshotSource};
use crate::common::thread_name;
use crate::workspace::GenerationTracker;
use crate::WorkspaceError;

/// Publishes reader snapshots of one index and refreshes them lazily.
///
/// A reader request only pays for a refresh when the [`GenerationTracker`] says the
/// published handle is stale. Refreshes are serialized; concurrent stale readers wait for
/// the one running refresh and share its result. Fresh readers never take the lock.
pub struct ReaderManager {
    index_name: String,
    source: Arc<dyn SnapshotSource>,
    generations: Arc<GenerationTracker>,
    current: ArcSwapOption<ReaderHandle>,
    refresh_lock: Mutex<()>,
    closed: AtomicBool,
}

impl ReaderManager {
    pub fn new(
        index_name: &str,
        source: Arc<dyn SnapshotSource>,
        generations: Arc<GenerationTracker>,
    ) -> ReaderManager {
        ReaderManager {
            index_name: index_name.to_string(),
            source,
            generations,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a handle reflecting every changeset whose generation requirement was
    /// allocated before the call, refreshing first if needed.
    ///
    /// The caller owns one reference and must give it back with
    /// [`ReaderManager::close_index_reader`].
    pub fn open_index_reader(&self) -> crate::Result<Arc<ReaderHandle>> {
        self.ensure_open()?;
        if self.generations.is_fresh() {
            if let Some(handle) = self.try_acquire_current() {
                return Ok(handle);
            }
        }
        self.refresh()
    }

    /// Returns the published handle as is, without looking at its freshness.
    ///
    /// A handle is opened when none was published yet.
    pub fn current_index_reader(&self) -> crate::Result<Arc<ReaderHandle>> {
        self.ensure_open()?;
        match self.try_acquire_current() {
            Some(handle) => Ok(handle),
            None => self.refresh(),
        }
    }

    /// Gives back a reference obtained from one of the `open` methods.
    pub fn close_index_reader(&self, handle: &ReaderHandle) -> crate::Result<()> {
        handle.dec_ref()
    }

    /// Generation of the published handle.
    pub fn current_generation(&self) -> crate::Generation {
        self.generations.current_reader_generation()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Unpublishes the current handle. Handles still held by readers stay valid until
    /// closed; new requests fail.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _guard = self.refresh_lock.lock();
        if let Some(previous) = self.current.swap(None) {
            self.release_published(&previous);
        }
        info!("[{}] [shutdown] reader manager of '{}' closed", thread_name(), self.index_name);
    }

    fn ensure_open(&self) -> crate::Result<()> {
        if self.is_closed() {
            return Err(WorkspaceError::InvariantViolation(format!(
                "reader requested on '{}' after shutdown",
                self.index_name
            )));
        }
        Ok(())
    }

    /// Takes a reference on the published handle.
    ///
    /// A handle whose count reached zero was unpublished in the meantime, so the load is
    /// retried. `None` when nothing usable is published.
    fn try_acquire_current(&self) -> Option<Arc<ReaderHandle>> {
        loop {
            let handle = self.current.load_full()?;
            if handle.try_inc_ref() {
                return Some(handle);
            }
            let latest = self.current.load_full();
            if latest.map_or(true, |latest| Arc::ptr_eq(&latest, &handle)) {
                return None;
            }
        }
    }

    fn refresh(&self) -> crate::Result<Arc<ReaderHandle>> {
        let _guard = self.refresh_lock.lock();
        self.ensure_open()?;

        // Another reader may have refreshed while we were waiting.
        if self.generations.is_fresh() {
            if let Some(handle) = self.try_acquire_current() {
                return Ok(handle);
            }
        }

        let (writes_gen, deletes_gen) = self.generations.requirements();
        let apply_deletes = self.generations.current_reader_generation() < deletes_gen;
        let target_gen = writes_gen.max(deletes_gen);

        let snapshot = match self.source.open_snapshot(apply_deletes) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if let Some(handle) = self.try_acquire_current() {
                    warn!(
                        "[{}] [refresh] failed to open a snapshot of '{}', keeping generation {}: {}",
                        thread_name(),
                        self.index_name,
                        handle.generation(),
                        err
                    );
                    return Ok(handle);
                }
                return Err(err);
            }
        };

        let handle = ReaderHandle::new(snapshot, target_gen, self.source.clone());
        // One reference for the manager, one for the caller.
        handle.inc_ref()?;
        if let Some(previous) = self.current.swap(Some(handle.clone())) {
            self.release_published(&previous);
        }
        self.generations.mark_reader_generation(target_gen);
        debug!(
            "[{}] [refresh] '{}' now at generation {}, apply_deletes: {}",
            thread_name(),
            self.index_name,
            target_gen,
            apply_deletes
        );
        Ok(handle)
    }

    fn release_published(&self, handle: &ReaderHandle) {
        if let Err(err) = handle.dec_ref() {
            warn!(
                "[{}] [release_published] '{}' generation {}: {}",
                thread_name(),
                self.index_name,
                handle.generation(),
                err
            );
        }
    }
}

impl Drop for ReaderManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
