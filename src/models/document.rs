use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored record: stable external id plus a JSON object payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable external identifier (the document's key in its collection)
    pub id: String,
    /// Document payload; always a JSON object at the top level
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Value at a dotted field path inside the payload, if present.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut cursor = &self.data;
        for segment in path.split('.') {
            cursor = cursor.as_object()?.get(segment)?;
        }
        Some(cursor)
    }
}
