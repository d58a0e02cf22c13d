pub mod directory;
pub mod directory_lock;
pub mod error;
pub mod fs_directory;
pub mod ram_directory;

pub use self::directory::{Directory, DirectoryClone, DirectoryLock};
pub use self::directory_lock::{Lock, INDEX_WRITER_LOCK};
pub use self::fs_directory::FsDirectory;
pub use self::ram_directory::RamDirectory;
