pub mod changeset;
pub mod flush_strategy;
pub mod index_writer;
pub mod operation;
pub mod stamper;

pub use self::changeset::Changeset;
pub use self::flush_strategy::{flush_effect, FlushEffect};
pub use self::index_writer::IndexWriter;
pub use self::operation::{DeleteOperation, Operation, OperationKind};
pub use self::stamper::Stamper;
