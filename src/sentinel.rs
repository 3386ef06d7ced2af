//! Sentinel substitution: lowering update payloads to backend directives.
//!
//! Runs immediately before a task is handed to the backend, never at task
//! construction time, so task descriptors stay backend-agnostic and
//! serializable. The walk recognizes both the tagged operator variants of
//! [`FieldValue`] and the legacy string sentinels hiding inside literal JSON,
//! including a bare top-level sentinel.

use crate::models::{FieldValue, DELETE_SENTINEL, INCREMENT_SENTINEL};
use crate::store::StoreValue;
use serde_json::Value;

/// Lower a payload tree into the backend's directive tree.
pub fn substitute(field: &FieldValue) -> StoreValue {
    match field {
        FieldValue::Delete => StoreValue::DeleteField,
        FieldValue::Increment(by) => StoreValue::Increment(*by),
        FieldValue::Map(map) => StoreValue::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), substitute(value)))
                .collect(),
        ),
        FieldValue::Literal(value) => substitute_literal(value),
    }
}

/// Recursive walk over a literal JSON tree: string leaves equal to a sentinel
/// become directives, nested objects are descended into, everything else is
/// written verbatim. Arrays are not descended into.
fn substitute_literal(value: &Value) -> StoreValue {
    match value {
        Value::String(s) if s == DELETE_SENTINEL => StoreValue::DeleteField,
        Value::String(s) if s == INCREMENT_SENTINEL => StoreValue::Increment(1),
        Value::Object(map) => StoreValue::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), substitute_literal(value)))
                .collect(),
        ),
        other => StoreValue::Literal(other.clone()),
    }
}
