mod reader_handle;
mod reader_manager;
pub(crate) mod snapshot;
mod snapshot_source;

pub use self::reader_handle::ReaderHandle;
pub use self::reader_manager::ReaderManager;
pub use self::snapshot::{Snapshot, SnapshotMeta};
pub use self::snapshot_source::SnapshotSource;
