use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{error, info};

use super::index_meta::{save_metas, IndexMeta};
use crate::common::errors::{DataCorruption, WorkspaceError};
use crate::directory::error::OpenReadError;
use crate::directory::{Directory, FsDirectory, RamDirectory, INDEX_WRITER_LOCK};
use crate::indexer::IndexWriter;
use crate::reader::snapshot::{SnapshotInventory, SnapshotMeta};
use crate::reader::Snapshot;
use crate::META_FILEPATH;

/// Read the `meta.json` file of the directory.
fn load_metas(directory: &dyn Directory) -> crate::Result<IndexMeta> {
    let meta_data = directory.atomic_read(&META_FILEPATH)?;
    let meta_string = String::from_utf8(meta_data).map_err(|_utf8_err| {
        error!("Meta data is not valid utf8.");
        DataCorruption::new(
            META_FILEPATH.to_path_buf(),
            "Meta file does not contain valid utf8 file.".to_string(),
        )
    })?;
    serde_json::from_str(&meta_string)
        .map_err(|e| {
            DataCorruption::new(
                META_FILEPATH.to_path_buf(),
                format!("Meta file cannot be deserialized. {e:?}. Content: {meta_string:?}"),
            )
        })
        .map_err(From::from)
}

/// Entry point of the storage engine: one physical index living in a [`Directory`].
#[derive(Clone)]
pub struct Index {
    /// The directory responsible for file I/O
    directory: Box<dyn Directory>,
    /// Repository for tracking live snapshots
    inventory: SnapshotInventory,
}

impl Index {
    /// Opens the index stored in `dir`, creating an empty one if there is none.
    pub fn open_or_create<T: Into<Box<dyn Directory>>>(dir: T) -> crate::Result<Index> {
        let directory: Box<dyn Directory> = dir.into();
        if !Index::exists(directory.as_ref())? {
            info!("[open_or_create] creating empty index in {:?}", directory);
            save_metas(&IndexMeta::default(), directory.as_ref())?;
        }
        Ok(Index { directory, inventory: SnapshotInventory::default() })
    }

    /// Creates a new index in anonymous memory.
    pub fn create_in_ram() -> Index {
        let directory = RamDirectory::create();
        let metas = IndexMeta::default();
        // Writing to a fresh RamDirectory can not fail.
        let _ = save_metas(&metas, &directory);
        Index { directory: Box::new(directory), inventory: SnapshotInventory::default() }
    }

    /// Opens (or creates) the index stored in the folder `directory_path`.
    pub fn open_in_dir<P: AsRef<Path>>(directory_path: P) -> crate::Result<Index> {
        let directory = FsDirectory::open(directory_path)?;
        Index::open_or_create(directory)
    }

    /// Check if the meta.json file exists.
    pub fn exists(dir: &dyn Directory) -> Result<bool, OpenReadError> {
        dir.exists(&META_FILEPATH)
    }

    /// Loads the last durable commit.
    pub fn load_metas(&self) -> crate::Result<IndexMeta> {
        load_metas(self.directory.as_ref())
    }

    /// Opens a new index writer, taking the index writer lock.
    ///
    /// # Errors
    /// If the lock is already held, return `WorkspaceError::LockFailure`.
    pub fn writer(&self) -> crate::Result<IndexWriter> {
        let directory_lock = self.directory.acquire_lock(&INDEX_WRITER_LOCK).map_err(|err| {
            WorkspaceError::LockFailure(
                err,
                Some(
                    "Failed to acquire index lock. This means there is already an `IndexWriter` \
                     working on this `Directory`, in this process or in a different process."
                        .to_string(),
                ),
            )
        })?;
        IndexWriter::new(self, directory_lock)
    }

    /// Opens a snapshot of the last durable commit.
    pub fn committed_snapshot(&self) -> crate::Result<Snapshot> {
        let metas = self.load_metas()?;
        let documents = metas.documents.into_iter().map(Arc::new).collect();
        Ok(self.inventory.new_snapshot(documents, metas.opstamp, true))
    }

    pub(crate) fn snapshot_inventory(&self) -> &SnapshotInventory {
        &self.inventory
    }

    /// Metas of every snapshot still referenced somewhere.
    pub fn live_snapshots(&self) -> Vec<SnapshotMeta> {
        self.inventory.all()
    }

    /// Return the directory currently used by the Index.
    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// Copies every file except the writer lock into `target`.
    pub fn copy_files_to(&self, target: &dyn Directory) -> crate::Result<usize> {
        let mut copied = 0;
        for path in self.directory.list_files()? {
            if path == INDEX_WRITER_LOCK.filepath {
                continue;
            }
            let data = self.directory.atomic_read(&path)?;
            target.atomic_write(&path, &data)?;
            copied += 1;
        }
        target.sync_directory()?;
        Ok(copied)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({:?})", self.directory)
    }
}
