mod index_backend;
mod index_manager;

pub use self::index_backend::IndexBackend;
pub use self::index_manager::IndexManager;
