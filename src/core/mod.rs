mod document;
mod query;

pub use document::{Document, Term, ID_FIELD};
pub use query::Query;
