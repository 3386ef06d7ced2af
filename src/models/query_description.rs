use crate::models::{Direction, FilterClause, FilterOp, OrderClause, PathSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default result-set cap applied when a description carries no explicit
/// limit. Bounds batch size and makes pagination detectable.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Immutable declarative description of a one-shot or live query.
///
/// Built fluently:
///
/// ```rust
/// use doclink::{Direction, FilterOp, QueryDescription};
/// use serde_json::json;
///
/// let desc = QueryDescription::new()
///     .filter("age", FilterOp::GreaterThanOrEqual, json!(21))
///     .order_by("age", Direction::Ascending)
///     .with_limit(50);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryDescription {
    /// Ordered filter clauses, all combined with AND
    pub filters: Vec<FilterClause>,
    /// Ordered sort clauses
    pub order_by: Vec<OrderClause>,
    /// Result cap; `None` means [`DEFAULT_QUERY_LIMIT`]
    pub limit: Option<usize>,
    /// Explicit start-cursor values, one per order clause (prefix allowed).
    /// Ignored whenever `continue_after` is set.
    pub start_at: Option<Vec<Value>>,
    /// Explicit end-cursor values, inclusive bound from the far side
    pub end_at: Option<Vec<Value>>,
    /// Continuation token: id of the previous page's last item. Takes
    /// precedence over `start_at`.
    pub continue_after: Option<String>,
}

impl QueryDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter clause.
    pub fn filter(mut self, path: impl Into<PathSpec>, op: FilterOp, value: Value) -> Self {
        self.filters.push(FilterClause::new(path, op, value));
        self
    }

    /// Append a sort clause.
    pub fn order_by(mut self, path: impl Into<PathSpec>, direction: Direction) -> Self {
        self.order_by.push(OrderClause::new(path, direction));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_at(mut self, values: Vec<Value>) -> Self {
        self.start_at = Some(values);
        self
    }

    pub fn end_at(mut self, values: Vec<Value>) -> Self {
        self.end_at = Some(values);
        self
    }

    /// Resume strictly after the item with the given id.
    pub fn continue_after(mut self, id: impl Into<String>) -> Self {
        self.continue_after = Some(id.into());
        self
    }

    /// The limit actually applied at the backend.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_limit() {
        let desc = QueryDescription::new();
        assert_eq!(desc.effective_limit(), DEFAULT_QUERY_LIMIT);
        assert_eq!(desc.with_limit(2).effective_limit(), 2);
    }

    #[test]
    fn test_builder_accumulates_clauses() {
        let desc = QueryDescription::new()
            .filter("a", FilterOp::Equal, json!(1))
            .filter(json!({"b": {"c": true}}), FilterOp::GreaterThan, json!(2))
            .order_by("a", Direction::Descending);
        assert_eq!(desc.filters.len(), 2);
        assert_eq!(desc.order_by.len(), 1);
    }
}
