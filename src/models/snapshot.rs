use crate::models::Document;
use serde::{Deserialize, Serialize};

/// Value broadcast to subscribers of a live query or document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Snapshot {
    /// Current result set of a live query
    Query(Vec<Document>),
    /// Current state of a single document; `None` after deletion
    Document(Option<Document>),
}

impl Snapshot {
    /// Documents carried by this snapshot (empty for a deleted document).
    pub fn documents(&self) -> &[Document] {
        match self {
            Snapshot::Query(docs) => docs,
            Snapshot::Document(Some(doc)) => std::slice::from_ref(doc),
            Snapshot::Document(None) => &[],
        }
    }
}
