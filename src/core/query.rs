use std::fmt;

use serde::{Deserialize, Serialize};

use super::document::{Document, Term};

/// Queries understood by the engine for lookups and delete-by-query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Exact match of a field value.
    Term(Term),
    /// The field value starts with the term text.
    Prefix(Term),
    MatchAll,
}

impl Query {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Query::Term(term) => document.matches_term(term),
            Query::Prefix(prefix) => document
                .field(prefix.field())
                .map(|value| value.starts_with(prefix.text()))
                .unwrap_or(false),
            Query::MatchAll => true,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(term) => write!(f, "{term}"),
            Query::Prefix(prefix) => write!(f, "{prefix}*"),
            Query::MatchAll => write!(f, "*:*"),
        }
    }
}
