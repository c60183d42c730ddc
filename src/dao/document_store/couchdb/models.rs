use serde::{Deserialize, Serialize};

use crate::dao::document::{CollectionPath, DocPath, Document, DocumentData};

/// CouchDB ids join path segments with `::` since `/` needs escaping in URLs.
const SEPARATOR: &str = "::";
/// Upper bound appended to a prefix for `_all_docs` range queries.
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<serde_json::Value>,
}

/// Envelope persisted for every document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default)]
    pub data: DocumentData,
}

impl CouchDocument {
    /// Drop the envelope, keeping the fields.
    pub fn into_document(self, path: DocPath) -> Document {
        Document {
            path,
            data: self.data,
        }
    }
}

/// CouchDB id of a document path.
pub fn doc_id(path: &DocPath) -> String {
    path.as_str().replace('/', SEPARATOR)
}

/// Prefix shared by every document below `collection`.
pub fn collection_prefix(collection: &CollectionPath) -> String {
    format!("{}{SEPARATOR}", collection.as_str().replace('/', SEPARATOR))
}

/// Ids under `prefix` that are direct children (no further separator).
pub fn is_direct_child(prefix: &str, id: &str) -> bool {
    id.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && !rest.contains(SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_mirror_paths() {
        let path = CollectionPath::session_players("123456").doc("p1");
        assert_eq!(doc_id(&path), "sessions::123456::players::p1");

        let prefix = collection_prefix(&CollectionPath::session_players("123456"));
        assert_eq!(prefix, "sessions::123456::players::");
        assert!(is_direct_child(&prefix, "sessions::123456::players::p1"));
        assert!(!is_direct_child(&prefix, "sessions::123456::players::p1::x::y"));
        assert!(!is_direct_child(&prefix, "sessions::123456::songs::s1"));
    }
}
