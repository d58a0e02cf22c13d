use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::warn;
use uuid::Uuid;

use crate::common::file_operations::atomic_save_bytes;
use crate::directory::directory::{Directory, DirectoryLock};
use crate::directory::directory_lock::Lock;
use crate::directory::error::{LockError, OpenReadError};

/// Directory backed by a folder of the local file system.
///
/// Writes go through a temporary file and a rename (`atomicwrites`),
/// locks are created with `create_new` so that two processes can not both win.
#[derive(Clone, Debug)]
pub struct FsDirectory {
    root_path: PathBuf,
}

impl FsDirectory {
    /// Opens (and creates if needed) the directory at `directory_path`.
    pub fn open<P: AsRef<Path>>(directory_path: P) -> io::Result<FsDirectory> {
        let root_path = directory_path.as_ref().to_path_buf();
        fs::create_dir_all(&root_path)?;
        Ok(FsDirectory { root_path })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn resolve_path(&self, relative_path: &Path) -> PathBuf {
        self.root_path.join(relative_path)
    }
}

struct FsLockGuard {
    full_path: PathBuf,
    session: String,
}

impl Drop for FsLockGuard {
    fn drop(&mut self) {
        let still_ours = fs::read_to_string(&self.full_path)
            .map(|content| content == self.session)
            .unwrap_or(false);
        if still_ours {
            if let Err(e) = fs::remove_file(&self.full_path) {
                warn!("Failed to remove lock file {:?}: {}", self.full_path, e);
            }
        }
    }
}

impl Directory for FsDirectory {
    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
        let full_path = self.resolve_path(path);
        let mut buffer = Vec::new();
        File::open(&full_path)
            .and_then(|mut file| file.read_to_end(&mut buffer))
            .map_err(|e| OpenReadError::wrap_io_error(e, path.to_path_buf()))?;
        Ok(buffer)
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        atomic_save_bytes(&self.resolve_path(path), data)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
        Ok(self.resolve_path(path).exists())
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(self.resolve_path(path)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root_path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(PathBuf::from(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn sync_directory(&self) -> io::Result<()> {
        #[cfg(unix)]
        {
            File::open(&self.root_path)?.sync_all()?;
        }
        Ok(())
    }

    fn try_acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, LockError> {
        let full_path = self.resolve_path(&lock.filepath);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&full_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(LockError::LockBusy),
            Err(e) => return Err(LockError::wrap_io_error(e)),
        };
        let session = Uuid::new_v4().to_string();
        file.write_all(session.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(LockError::wrap_io_error)?;
        Ok(DirectoryLock::from(Box::new(FsLockGuard { full_path, session })))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::directory::INDEX_WRITER_LOCK;

    #[test]
    fn test_fs_directory_write_list_delete() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FsDirectory::open(temp_dir.path()).unwrap();
        directory.atomic_write(Path::new("meta.json"), b"{\"opstamp\":3}").unwrap();
        assert_eq!(directory.list_files().unwrap(), vec![PathBuf::from("meta.json")]);
        assert_eq!(directory.atomic_read(Path::new("meta.json")).unwrap(), b"{\"opstamp\":3}".to_vec());
        directory.delete(Path::new("meta.json")).unwrap();
        directory.delete(Path::new("meta.json")).unwrap();
        assert!(matches!(
            directory.atomic_read(Path::new("meta.json")),
            Err(OpenReadError::FileDoesNotExist(_))
        ));
    }

    #[test]
    fn test_fs_lock_contention() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FsDirectory::open(temp_dir.path()).unwrap();
        let other = FsDirectory::open(temp_dir.path()).unwrap();
        let lock = directory.acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        assert!(matches!(other.acquire_lock(&INDEX_WRITER_LOCK), Err(LockError::LockBusy)));
        drop(lock);
        assert!(other.acquire_lock(&INDEX_WRITER_LOCK).is_ok());
    }

    #[test]
    fn test_fs_force_release() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FsDirectory::open(temp_dir.path()).unwrap();
        let _stale = directory.acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        directory.force_release_lock(&INDEX_WRITER_LOCK).unwrap();
        assert!(!directory.is_locked(&INDEX_WRITER_LOCK));
        assert!(directory.acquire_lock(&INDEX_WRITER_LOCK).is_ok());
    }
}
