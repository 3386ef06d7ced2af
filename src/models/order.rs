use crate::models::PathSpec;
use serde::{Deserialize, Serialize};

/// Sort direction for an order clause. Ascending is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One sort clause of a query description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderClause {
    pub path: PathSpec,
    pub direction: Direction,
}

impl OrderClause {
    pub fn new(path: impl Into<PathSpec>, direction: Direction) -> Self {
        Self {
            path: path.into(),
            direction,
        }
    }

    pub fn ascending(path: impl Into<PathSpec>) -> Self {
        Self::new(path, Direction::Ascending)
    }

    pub fn descending(path: impl Into<PathSpec>) -> Self {
        Self::new(path, Direction::Descending)
    }
}
