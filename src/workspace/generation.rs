use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::indexer::{FlushEffect, Stamper};
use crate::Generation;

/// Tracks which reader generation is required to observe the applied changesets.
///
/// Changesets raise the `need_flush_*` flags. Completed non-streaming changesets fold the
/// flags into a freshly allocated generation, stored as a requirement. Readers are fresh
/// as long as `current_reader_gen` is at least both requirements.
///
/// Every counter only moves forward until [`GenerationTracker::reset`].
pub struct GenerationTracker {
    generator: Stamper,
    current_reader_gen: AtomicU64,
    gen_requiring_flush_writes: AtomicU64,
    gen_requiring_flush_deletes: AtomicU64,
    need_flush_writes: AtomicBool,
    need_flush_deletes: AtomicBool,
}

impl Default for GenerationTracker {
    fn default() -> Self {
        GenerationTracker::new()
    }
}

impl GenerationTracker {
    pub fn new() -> GenerationTracker {
        GenerationTracker {
            generator: Stamper::new(1),
            current_reader_gen: AtomicU64::new(0),
            gen_requiring_flush_writes: AtomicU64::new(0),
            gen_requiring_flush_deletes: AtomicU64::new(0),
            need_flush_writes: AtomicBool::new(false),
            need_flush_deletes: AtomicBool::new(false),
        }
    }

    /// Marks readers as dirty for the given effect, without requiring a new generation yet.
    pub fn raise(&self, effect: FlushEffect) {
        if effect.writes {
            self.need_flush_writes.store(true, Ordering::Release);
        }
        if effect.deletes {
            self.need_flush_deletes.store(true, Ordering::Release);
        }
    }

    pub fn has_pending_flags(&self) -> bool {
        self.need_flush_writes.load(Ordering::Acquire) || self.need_flush_deletes.load(Ordering::Acquire)
    }

    /// Turns the pending flags into a generation requirement and resets them.
    ///
    /// Returns the allocated generation, or `None` when no flag was set.
    pub fn fold_pending(&self) -> Option<Generation> {
        let writes = self.need_flush_writes.swap(false, Ordering::AcqRel);
        let deletes = self.need_flush_deletes.swap(false, Ordering::AcqRel);
        if !writes && !deletes {
            return None;
        }
        let generation = self.generator.stamp();
        self.gen_requiring_flush_writes.fetch_max(generation, Ordering::AcqRel);
        if deletes {
            self.gen_requiring_flush_deletes.fetch_max(generation, Ordering::AcqRel);
        }
        Some(generation)
    }

    /// `(gen_requiring_flush_writes, gen_requiring_flush_deletes)`
    pub fn requirements(&self) -> (Generation, Generation) {
        (
            self.gen_requiring_flush_writes.load(Ordering::Acquire),
            self.gen_requiring_flush_deletes.load(Ordering::Acquire),
        )
    }

    pub fn current_reader_generation(&self) -> Generation {
        self.current_reader_gen.load(Ordering::Acquire)
    }

    pub fn is_fresh(&self) -> bool {
        let current = self.current_reader_generation();
        let (writes, deletes) = self.requirements();
        current >= writes && current >= deletes
    }

    /// Records that the published reader satisfies every requirement up to `generation`.
    pub fn mark_reader_generation(&self, generation: Generation) {
        self.current_reader_gen.fetch_max(generation, Ordering::AcqRel);
    }

    /// Back to the initial state. Only called at shutdown.
    pub fn reset(&self) {
        self.need_flush_writes.store(false, Ordering::Release);
        self.need_flush_deletes.store(false, Ordering::Release);
        self.gen_requiring_flush_writes.store(0, Ordering::Release);
        self.gen_requiring_flush_deletes.store(0, Ordering::Release);
        self.current_reader_gen.store(0, Ordering::Release);
    }
}
