//! Subscription fingerprints.
//!
//! Two subscriptions share one backend listener exactly when their
//! fingerprints match, so the fingerprint must be stable across equivalent
//! descriptions. Shape-derived and dotted-string paths are normalized to the
//! same dotted form before hashing.

use crate::error::Result;
use crate::models::{Direction, QueryDescription};
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fingerprint for a live query subscription.
pub fn query_fingerprint(collection: &str, desc: &QueryDescription) -> Result<String> {
    let canonical = canonical_form(collection, desc)?;
    let mut hasher = DefaultHasher::new();
    canonical.to_string().hash(&mut hasher);
    Ok(format!("query:{}:{:016x}", collection, hasher.finish()))
}

/// Fingerprint for a single-document subscription.
pub fn doc_fingerprint(collection: &str, id: &str) -> String {
    format!("doc:{}/{}", collection, id)
}

fn canonical_form(collection: &str, desc: &QueryDescription) -> Result<Value> {
    let filters: Vec<Value> = desc
        .filters
        .iter()
        .map(|f| Ok(json!([f.path.resolve()?, f.op.as_str(), f.value])))
        .collect::<Result<_>>()?;
    let order_by: Vec<Value> = desc
        .order_by
        .iter()
        .map(|o| {
            let dir = match o.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            Ok(json!([o.path.resolve()?, dir]))
        })
        .collect::<Result<_>>()?;
    Ok(json!({
        "collection": collection,
        "filters": filters,
        "order_by": order_by,
        "limit": desc.effective_limit(),
        "start_at": desc.start_at,
        "end_at": desc.end_at,
        "continue_after": desc.continue_after,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterOp;
    use serde_json::json;

    #[test]
    fn test_equivalent_paths_share_a_fingerprint() {
        let dotted =
            QueryDescription::new().filter("favFoods.asian", FilterOp::Equal, json!("ramen"));
        let shaped = QueryDescription::new().filter(
            json!({"favFoods": {"asian": true}}),
            FilterOp::Equal,
            json!("ramen"),
        );
        assert_eq!(
            query_fingerprint("users", &dotted).unwrap(),
            query_fingerprint("users", &shaped).unwrap()
        );
    }

    #[test]
    fn test_different_filters_differ() {
        let a = QueryDescription::new().filter("age", FilterOp::Equal, json!(30));
        let b = QueryDescription::new().filter("age", FilterOp::Equal, json!(31));
        assert_ne!(
            query_fingerprint("users", &a).unwrap(),
            query_fingerprint("users", &b).unwrap()
        );
    }

    #[test]
    fn test_doc_fingerprint_format() {
        assert_eq!(doc_fingerprint("users", "u1"), "doc:users/u1");
    }
}
