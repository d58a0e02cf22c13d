/// Default maximum number of changesets waiting in one index's sequencer queue.
pub const DEFAULT_QUEUE_MAX_LEN: usize = 1000;

/// Prefix of the consumer thread applying changesets of one index.
pub const SEQUENCER_THREAD_PREFIX: &str = "thrd-ws-seq";

/// Log target used when restricting output to this library.
pub const LOG_TARGET: &str = "index_workspace";
