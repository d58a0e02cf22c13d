use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the field holding the document identifier.
pub const ID_FIELD: &str = "id";

/// A `(field, text)` pair identifying documents, e.g. for deletion or update.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    field: String,
    text: String,
}

impl Term {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Term {
        Term { field: field.into(), text: text.into() }
    }

    /// Term matching the document whose id is `id`.
    pub fn for_id<T: Into<String>>(id: T) -> Term {
        Term::new(ID_FIELD, id)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// Payload of an add/update operation: an id plus named string fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new<T: Into<String>>(id: T) -> Document {
        Document { id: id.into(), fields: BTreeMap::new() }
    }

    pub fn add_field<F: Into<String>, V: Into<String>>(&mut self, field: F, value: V) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_term(&self) -> Term {
        Term::for_id(self.id.clone())
    }

    pub fn field(&self, field: &str) -> Option<&str> {
        if field == ID_FIELD {
            return Some(&self.id);
        }
        self.fields.get(field).map(String::as_str)
    }

    pub fn matches_term(&self, term: &Term) -> bool {
        self.field(term.field()) == Some(term.text())
    }
}
