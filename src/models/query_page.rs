use crate::models::{Document, QueryDescription};
use serde::{Deserialize, Serialize};

/// One page of query results plus the continuation description, if any.
///
/// `next` is present exactly when the page size equals the requested (or
/// default) limit. It signals "there may be more", not "there are more".
/// A final page that coincidentally fills the limit costs one extra empty
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPage {
    pub items: Vec<Document>,
    pub next: Option<QueryDescription>,
}

impl QueryPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}
