use crate::error::Result;
use crate::path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A field-path target, given either as a dotted string (`"favFoods.asian"`)
/// or as a shape object mirroring the record's nesting with a single truthy
/// leaf (`{"favFoods": {"asian": true}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSpec {
    Dotted(String),
    Shape(Value),
}

impl PathSpec {
    /// Resolve to a dotted path string. Shape objects go through the path
    /// resolver and can fail on empty or multi-key levels.
    pub fn resolve(&self) -> Result<String> {
        match self {
            PathSpec::Dotted(path) => path::validate_dotted(path),
            PathSpec::Shape(shape) => path::resolve_path(shape),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        PathSpec::Dotted(path.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(path: String) -> Self {
        PathSpec::Dotted(path)
    }
}

impl From<Value> for PathSpec {
    fn from(shape: Value) -> Self {
        PathSpec::Shape(shape)
    }
}
