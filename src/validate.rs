//! Pluggable schema validation, consumed as an interface only.

use serde_json::Value;

/// Result of validating one payload against a collection's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    Fail(String),
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }
}

/// Validates full document payloads per collection. Full-document validation
/// runs fatally on `add`; reads validate advisorily (log-only).
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, collection: &str, data: &Value) -> ValidationOutcome;
}

/// Default validator: everything passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, _collection: &str, _data: &Value) -> ValidationOutcome {
        ValidationOutcome::Pass
    }
}
