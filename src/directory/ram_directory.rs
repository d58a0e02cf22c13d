use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::directory::directory::{Directory, DirectoryLock};
use crate::directory::directory_lock::Lock;
use crate::directory::error::{LockError, OpenReadError};

/// A Directory storing everything in anonymous memory.
///
/// Clones share the same files, so a clone handed to a second writer
/// sees (and contends on) the same lock.
#[derive(Clone, Default)]
pub struct RamDirectory {
    fs: Arc<RwLock<HashMap<PathBuf, Arc<Vec<u8>>>>>,
}

impl std::fmt::Debug for RamDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RamDirectory({} files)", self.fs.read().len())
    }
}

impl RamDirectory {
    /// Constructor
    pub fn create() -> RamDirectory {
        Self::default()
    }

    /// Returns the sum of the size of the different files in the [`RamDirectory`].
    pub fn total_mem_usage(&self) -> usize {
        self.fs.read().values().map(|data| data.len()).sum()
    }
}

/// Removes the lock file on drop, unless somebody else re-acquired it in between.
struct RamLockGuard {
    fs: Arc<RwLock<HashMap<PathBuf, Arc<Vec<u8>>>>>,
    filepath: PathBuf,
    session: Vec<u8>,
}

impl Drop for RamLockGuard {
    fn drop(&mut self) {
        let mut fs = self.fs.write();
        let still_ours = fs
            .get(&self.filepath)
            .map(|content| content.as_slice() == self.session.as_slice())
            .unwrap_or(false);
        if still_ours {
            fs.remove(&self.filepath);
        }
    }
}

impl Directory for RamDirectory {
    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
        self.fs
            .read()
            .get(path)
            .map(|data| data.as_ref().clone())
            .ok_or_else(|| OpenReadError::FileDoesNotExist(path.to_path_buf()))
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.fs.write().insert(path.to_path_buf(), Arc::new(data.to_vec()));
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
        Ok(self.fs.read().contains_key(path))
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.fs.write().remove(path);
        Ok(())
    }

    fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self.fs.read().keys().cloned().collect();
        files.sort();
        Ok(files)
    }

    fn try_acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, LockError> {
        let mut fs = self.fs.write();
        if fs.contains_key(&lock.filepath) {
            return Err(LockError::LockBusy);
        }
        let session = Uuid::new_v4().to_string().into_bytes();
        fs.insert(lock.filepath.clone(), Arc::new(session.clone()));
        Ok(DirectoryLock::from(Box::new(RamLockGuard {
            fs: self.fs.clone(),
            filepath: lock.filepath.clone(),
            session,
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::directory::{DirectoryClone, INDEX_WRITER_LOCK};

    /// RAM directory whose writes can be switched off, as on a full disk.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct FlakyDirectory {
        inner: RamDirectory,
        fail_writes: Arc<AtomicBool>,
    }

    impl FlakyDirectory {
        pub(crate) fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    impl Directory for FlakyDirectory {
        fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
            self.inner.atomic_read(path)
        }

        fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.inner.atomic_write(path, data)
        }

        fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
            self.inner.exists(path)
        }

        fn delete(&self, path: &Path) -> io::Result<()> {
            self.inner.delete(path)
        }

        fn list_files(&self) -> io::Result<Vec<PathBuf>> {
            self.inner.list_files()
        }

        fn try_acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, LockError> {
            self.inner.try_acquire_lock(lock)
        }
    }

    #[test]
    fn test_flaky_directory_rejects_writes() {
        let directory = FlakyDirectory::default();
        directory.set_fail_writes(true);
        assert!(directory.atomic_write(Path::new("meta.json"), b"{}").is_err());
        directory.set_fail_writes(false);
        directory.atomic_write(Path::new("meta.json"), b"{}").unwrap();
        assert!(directory.exists(Path::new("meta.json")).unwrap());
    }

    #[test]
    fn test_ram_directory_read_write() {
        let directory = RamDirectory::create();
        let path = Path::new("meta.json");
        assert!(!directory.exists(path).unwrap());
        directory.atomic_write(path, b"{}").unwrap();
        assert_eq!(directory.atomic_read(path).unwrap(), b"{}".to_vec());
        assert_eq!(directory.total_mem_usage(), 2);
        directory.delete(path).unwrap();
        assert!(matches!(directory.atomic_read(path), Err(OpenReadError::FileDoesNotExist(_))));
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let directory = RamDirectory::create();
        let lock = directory.acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        assert!(directory.is_locked(&INDEX_WRITER_LOCK));
        assert!(matches!(
            directory.box_clone().acquire_lock(&INDEX_WRITER_LOCK),
            Err(LockError::LockBusy)
        ));
        drop(lock);
        assert!(!directory.is_locked(&INDEX_WRITER_LOCK));
        assert!(directory.acquire_lock(&INDEX_WRITER_LOCK).is_ok());
    }

    #[test]
    fn test_stale_guard_does_not_release_new_holder() {
        let directory = RamDirectory::create();
        let stale = directory.acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        directory.force_release_lock(&INDEX_WRITER_LOCK).unwrap();
        let _fresh = directory.acquire_lock(&INDEX_WRITER_LOCK).unwrap();
        drop(stale);
        assert!(directory.is_locked(&INDEX_WRITER_LOCK));
    }
}
