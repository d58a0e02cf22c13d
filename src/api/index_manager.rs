use std::sync::Arc;

use flurry::HashMap;
use log::{debug, error, warn};

use super::IndexBackend;
use crate::common::thread_name;
use crate::config::WorkspaceConfig;
use crate::index::Index;
use crate::WorkspaceError;

/// Registry of the index backends of the process, keyed by index name.
///
/// Each backend owns its queue, consumer thread and writer, so indexes never wait on
/// each other.
pub struct IndexManager {
    backends: HashMap<String, Arc<IndexBackend>>,
}

impl Default for IndexManager {
    fn default() -> Self {
        IndexManager::new()
    }
}

impl IndexManager {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    /// Opens a backend for `index` and registers it under `config.index_name`.
    ///
    /// # Errors
    /// `InvalidArgument` if a backend is already registered under that name.
    pub fn create_backend(&self, index: Index, config: WorkspaceConfig) -> crate::Result<Arc<IndexBackend>> {
        let index_name = config.index_name.clone();
        if self.backends.pin().contains_key(&index_name) {
            return Err(WorkspaceError::InvalidArgument(format!(
                "index backend already exists with given name: [{index_name}]"
            )));
        }
        let backend = Arc::new(IndexBackend::open(index, config)?);
        let pinned = self.backends.pin();
        if pinned.try_insert(index_name.clone(), backend.clone()).is_err() {
            // Lost a race against another creation of the same name.
            backend.shutdown()?;
            return Err(WorkspaceError::InvalidArgument(format!(
                "index backend already exists with given name: [{index_name}]"
            )));
        }
        debug!("[{}] [create_backend] registered [{}]", thread_name(), index_name);
        Ok(backend)
    }

    pub fn get_backend(&self, index_name: &str) -> crate::Result<Arc<IndexBackend>> {
        match self.backends.pin().get(index_name) {
            Some(backend) => Ok(backend.clone()),
            None => Err(WorkspaceError::InvalidArgument(format!(
                "index backend doesn't exist with given name: [{index_name}]"
            ))),
        }
    }

    pub fn contains(&self, index_name: &str) -> bool {
        self.backends.pin().contains_key(index_name)
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.pin().keys().cloned().collect();
        names.sort();
        names
    }

    /// Unregisters and shuts down the backend of `index_name`. Unknown names are ignored.
    pub fn remove_backend(&self, index_name: &str) -> crate::Result<()> {
        let removed = self.backends.pin().remove(index_name).cloned();
        match removed {
            Some(backend) => backend.shutdown(),
            None => {
                debug!(
                    "[{}] [remove_backend] nothing registered with given name: [{}]",
                    thread_name(),
                    index_name
                );
                Ok(())
            }
        }
    }

    /// Shuts every backend down. Returns the first error, after trying all of them.
    pub fn shutdown_all(&self) -> crate::Result<()> {
        let mut first_error = None;
        for index_name in self.index_names() {
            if let Err(err) = self.remove_backend(&index_name) {
                error!("[{}] [shutdown_all] [{}] failed: {}", thread_name(), index_name, err);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown_all() {
            warn!("[{}] [drop] index manager: {}", thread_name(), err);
        }
    }
}
