//! Tagged update-payload tree.
//!
//! Mutation payloads are expressed as [`FieldValue`] trees rather than raw
//! JSON so that field operators (delete, increment) are distinct variants
//! instead of magic values. The legacy string sentinels are still recognized
//! when a payload is built from raw JSON via [`FieldValue::from_json`]; a
//! legitimate stored string equal to a sentinel will be misinterpreted as an
//! operator, which is a documented limitation of the sentinel encoding, not
//! of the tagged variants.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved marker string for "remove this field".
pub const DELETE_SENTINEL: &str = "__DELETE__";

/// Reserved marker string for "atomically increment this field by one".
pub const INCREMENT_SENTINEL: &str = "__INCREMENT__";

/// One node of an update payload: a literal leaf, a nested mapping, or a
/// field-operator intent. Serializable and backend-agnostic; operators are
/// lowered to backend directives only at batch-compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Plain JSON value written verbatim
    Literal(Value),
    /// Nested mapping; merged field-by-field on `update`
    Map(BTreeMap<String, FieldValue>),
    /// Remove the field at this position
    Delete,
    /// Atomically increment the field at this position
    Increment(i64),
}

impl FieldValue {
    /// Increment-by-one operator, matching the sentinel's semantics.
    pub fn increment() -> Self {
        FieldValue::Increment(1)
    }

    /// Build a payload tree from raw JSON, recognizing the string sentinels.
    ///
    /// Objects become [`FieldValue::Map`] nodes; string leaves equal to
    /// [`DELETE_SENTINEL`] or [`INCREMENT_SENTINEL`] become the corresponding
    /// operator variants; everything else stays literal. Arrays are not
    /// descended into; list-valued fields are out of scope and should be
    /// modeled as keyed objects.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
            ),
            Value::String(s) if s == DELETE_SENTINEL => FieldValue::Delete,
            Value::String(s) if s == INCREMENT_SENTINEL => FieldValue::Increment(1),
            other => FieldValue::Literal(other),
        }
    }

    /// Single-entry map node, convenient for building nested payloads.
    pub fn entry(key: impl Into<String>, value: FieldValue) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), value);
        FieldValue::Map(map)
    }

    pub fn is_empty_map(&self) -> bool {
        matches!(self, FieldValue::Map(map) if map.is_empty())
    }
}
