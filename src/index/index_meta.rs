use std::io::Write;
use std::thread;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::directory::Directory;
use crate::{Opstamp, META_FILEPATH};

/// Meta information about the last durable commit.
///
/// This is the content of `meta.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Documents visible at the commit, deletes already applied.
    pub documents: Vec<Document>,
    /// Opstamp of the commit.
    pub opstamp: Opstamp,
    /// Payload associated with the last commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub payload: Option<String>,
}

/// Saves the index meta file.
pub fn save_metas(metas: &IndexMeta, directory: &dyn Directory) -> crate::Result<()> {
    let mut buffer = serde_json::to_vec_pretty(metas)?;
    // Just adding a new line at the end of the buffer.
    writeln!(&mut buffer)?;
    directory.atomic_write(&META_FILEPATH, &buffer[..])?;
    directory.sync_directory()?;
    debug!(
        "[{}] - [save_metas] documents size: {}, opstamp: {}, payload: {:?}",
        thread::current().name().unwrap_or_default(),
        metas.documents.len(),
        metas.opstamp,
        metas.payload
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::index::index_meta::IndexMeta;

    #[test]
    fn test_serialize_metas() {
        let index_metas = IndexMeta { documents: Vec::new(), opstamp: 0u64, payload: None };
        let json = serde_json::ser::to_string(&index_metas).expect("serialization failed");
        assert_eq!(json, r#"{"documents":[],"opstamp":0}"#);

        let deser_meta: IndexMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(index_metas, deser_meta);
    }

    #[test]
    fn test_deserialize_metas_with_payload() {
        let json = r#"{"documents":[{"id":"a","fields":{"title":"Dune"}}],"opstamp":4,"payload":"bulk"}"#;
        let meta: IndexMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.opstamp, 4);
        assert_eq!(meta.documents[0].field("title"), Some("Dune"));
        assert_eq!(meta.payload.as_deref(), Some("bulk"));
    }
}
