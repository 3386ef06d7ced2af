//! Path resolution from nested shape objects.
//!
//! A shape object mirrors a subset of a record's fields and marks exactly one
//! target field with a scalar leaf (conventionally `true`). Resolution walks
//! one key per level, accumulating the traversed keys into a dotted path.
//! Levels with more than one key are rejected outright: following the first
//! enumerated key would make the target depend on key order, so the ambiguity
//! is a construction error here.
//!
//! The same traversal extracts the value at the resolved path from a
//! companion tree (a filter's comparison value, or a `set_path` replacement
//! payload).

use crate::error::{DocLinkError, Result};
use crate::models::FieldValue;
use serde_json::Value;

/// Resolve a shape object to a dotted field path.
pub fn resolve_path(shape: &Value) -> Result<String> {
    let mut segments: Vec<&str> = Vec::new();
    let mut cursor = shape;
    loop {
        let map = match cursor {
            Value::Object(map) => map,
            _leaf => break,
        };
        if map.len() > 1 {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Err(DocLinkError::InvalidPathShape(format!(
                "ambiguous level with {} sibling keys: {:?}",
                map.len(),
                keys
            )));
        }
        match map.iter().next() {
            Some((key, child)) => {
                segments.push(key);
                cursor = child;
            }
            None => {
                return Err(DocLinkError::InvalidPathShape(
                    "empty object level in path shape".to_string(),
                ));
            }
        }
    }
    if segments.is_empty() {
        return Err(DocLinkError::InvalidPathShape(
            "path shape must be an object with one marked leaf".to_string(),
        ));
    }
    Ok(segments.join("."))
}

/// Validate a dotted path given directly as a string.
pub fn validate_dotted(path: &str) -> Result<String> {
    if path.is_empty() || path.split('.').any(|segment| segment.is_empty()) {
        return Err(DocLinkError::InvalidPathShape(format!(
            "malformed dotted path '{}'",
            path
        )));
    }
    Ok(path.to_string())
}

/// Extract the value at the shape's resolved path from a companion JSON tree.
pub fn extract_value(shape: &Value, companion: &Value) -> Result<Value> {
    let path = resolve_path(shape)?;
    let mut cursor = companion;
    for segment in path.split('.') {
        cursor = cursor
            .as_object()
            .and_then(|map| map.get(segment))
            .ok_or_else(|| {
                DocLinkError::InvalidPathShape(format!(
                    "companion value has nothing at path '{}' (missing '{}')",
                    path, segment
                ))
            })?;
    }
    Ok(cursor.clone())
}

/// Extract the sub-tree at the shape's resolved path from a companion
/// [`FieldValue`] tree. Descends through `Map` nodes first and falls through
/// into literal JSON objects when the typed layer ends early.
pub fn extract_field_value(shape: &Value, companion: &FieldValue) -> Result<FieldValue> {
    let path = resolve_path(shape)?;
    let segments: Vec<&str> = path.split('.').collect();
    let mut cursor = companion;
    for (index, segment) in segments.iter().enumerate() {
        match cursor {
            FieldValue::Map(map) => {
                cursor = map.get(*segment).ok_or_else(|| missing(&path, segment))?;
            }
            FieldValue::Literal(value) => {
                let mut sub = value;
                for segment in &segments[index..] {
                    sub = sub
                        .as_object()
                        .and_then(|map| map.get(*segment))
                        .ok_or_else(|| missing(&path, segment))?;
                }
                return Ok(FieldValue::from_json(sub.clone()));
            }
            _ => {
                return Err(DocLinkError::InvalidPathShape(format!(
                    "companion payload ends before path '{}'",
                    path
                )));
            }
        }
    }
    Ok(cursor.clone())
}

fn missing(path: &str, segment: &str) -> DocLinkError {
    DocLinkError::InvalidPathShape(format!(
        "companion payload has nothing at path '{}' (missing '{}')",
        path, segment
    ))
}
