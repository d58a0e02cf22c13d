mod index;
mod index_meta;

pub use self::index::Index;
pub use self::index_meta::{save_metas, IndexMeta};
