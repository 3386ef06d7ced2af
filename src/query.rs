//! Query compilation and paged execution.
//!
//! A [`QueryDescription`] is declarative and backend-agnostic; compilation
//! resolves every shape-derived path to its dotted form, applies the default
//! limit, and materializes the continuation anchor. Execution wraps the
//! result set in a [`QueryPage`] carrying the ready-made description for the
//! next page when the current one came back full.

use crate::error::{DocLinkError, Result};
use crate::models::{Document, QueryDescription, QueryPage};
use crate::store::{CompiledFilter, CompiledOrder, CompiledQuery, DocumentStore};
use log::debug;

/// Compile a description against a collection. Fetches the continuation
/// anchor when the description carries a token; a missing anchor is an error
/// since silently restarting from the top would re-deliver earlier pages.
pub async fn compile(
    store: &dyn DocumentStore,
    collection: &str,
    desc: &QueryDescription,
) -> Result<CompiledQuery> {
    let filters = desc
        .filters
        .iter()
        .map(|f| {
            Ok(CompiledFilter {
                path: f.path.resolve()?,
                op: f.op,
                value: f.value.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let order_by = desc
        .order_by
        .iter()
        .map(|o| {
            Ok(CompiledOrder {
                path: o.path.resolve()?,
                direction: o.direction,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (start_at, start_after) = match &desc.continue_after {
        Some(anchor_id) => {
            let anchor = store.get_by_id(collection, anchor_id).await?.ok_or_else(|| {
                DocLinkError::QueryError(format!(
                    "continuation anchor '{}' not found in '{}'",
                    anchor_id, collection
                ))
            })?;
            // The token wins over any explicit start cursor.
            (None, Some(anchor))
        }
        None => (desc.start_at.clone(), None),
    };

    Ok(CompiledQuery {
        collection: collection.to_string(),
        filters,
        order_by,
        limit: desc.effective_limit(),
        start_at,
        start_after,
        end_at: desc.end_at.clone(),
    })
}

/// Compile and run one page of a query.
pub async fn run(
    store: &dyn DocumentStore,
    collection: &str,
    desc: &QueryDescription,
) -> Result<QueryPage> {
    let compiled = compile(store, collection, desc).await?;
    let items = store.run_query(&compiled).await?;
    debug!(
        "[QUERY] '{}' returned {} of max {}",
        collection,
        items.len(),
        compiled.limit
    );
    let next = derive_continuation(desc, &items);
    Ok(QueryPage { items, next })
}

/// A full page signals more data may follow: the next description resumes
/// strictly after the last returned item. A short page ends the walk.
fn derive_continuation(desc: &QueryDescription, items: &[Document]) -> Option<QueryDescription> {
    let limit = desc.effective_limit();
    if limit == 0 || items.len() < limit {
        return None;
    }
    let last = items.last()?;
    let mut next = desc.clone();
    next.start_at = None;
    next.continue_after = Some(last.id.clone());
    Some(next)
}
