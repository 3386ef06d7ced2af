use crate::error::{DocLinkError, Result};
use crate::models::PathSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Whitelisted comparison operators for filter clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    LessThan,
    LessThanOrEqual,
    Equal,
    GreaterThanOrEqual,
    GreaterThan,
    ArrayContains,
}

impl FilterOp {
    /// Parse the wire/display form. Anything outside the whitelist is a
    /// construction-time error.
    pub fn parse(op: &str) -> Result<Self> {
        match op {
            "<" => Ok(FilterOp::LessThan),
            "<=" => Ok(FilterOp::LessThanOrEqual),
            "==" => Ok(FilterOp::Equal),
            ">=" => Ok(FilterOp::GreaterThanOrEqual),
            ">" => Ok(FilterOp::GreaterThan),
            "array-contains" => Ok(FilterOp::ArrayContains),
            other => Err(DocLinkError::InvalidFilter(format!(
                "unsupported operator '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::Equal => "==",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::GreaterThan => ">",
            FilterOp::ArrayContains => "array-contains",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One filter clause of a query description: field path, operator, value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub path: PathSpec,
    pub op: FilterOp,
    pub value: Value,
}

impl FilterClause {
    pub fn new(path: impl Into<PathSpec>, op: FilterOp, value: Value) -> Self {
        Self {
            path: path.into(),
            op,
            value,
        }
    }
}
