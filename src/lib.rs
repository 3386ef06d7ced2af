//! # doclink
//!
//! Typed client-side access layer over a remote, eventually-consistent
//! document store.
//!
//! The store itself is a collaborator behind the [`DocumentStore`] trait;
//! this crate supplies everything in front of it:
//!
//! - **Declarative queries** ([`QueryDescription`]) compiled to
//!   backend-native form, with path-from-shape derivation, a default result
//!   cap, and continuation-token pagination ([`QueryPage`]).
//! - **Deferred mutations** ([`WriteTask`]) with tagged field operators
//!   ([`FieldValue`]) lowered to backend directives at commit time, committed
//!   one-by-one or batched atomically.
//! - **Multiplexed subscriptions**: equivalent live queries share one
//!   backend listener, late subscribers get the cached snapshot replayed,
//!   and the listener is torn down with the last subscriber.
//!
//! ```rust,no_run
//! use doclink::{Direction, DocLinkClient, FilterOp, MemoryStore, QueryDescription};
//! use serde_json::json;
//!
//! # async fn run() -> doclink::Result<()> {
//! let client = DocLinkClient::builder().store(MemoryStore::new()).build()?;
//! let users = client.collection("users");
//!
//! let page = users
//!     .query(
//!         &QueryDescription::new()
//!             .filter("age", FilterOp::GreaterThanOrEqual, json!(21))
//!             .order_by("age", Direction::Ascending)
//!             .with_limit(100),
//!     )
//!     .await?;
//! println!("{} users", page.items.len());
//! # Ok(())
//! # }
//! ```

mod batch;
mod client;
mod collection;
mod error;
mod fingerprint;
mod ids;
mod path;
mod query;
mod sentinel;
mod stats;
mod subscription;
mod validate;

pub mod models;
pub mod store;

pub use client::{DocLinkClient, DocLinkClientBuilder};
pub use collection::CollectionClient;
pub use error::{DocLinkError, Result};
pub use ids::{IdGenerator, TimestampIdGenerator};
pub use models::{
    Direction, Document, FieldValue, FilterClause, FilterOp, GetOptions, OrderClause, PathSpec,
    QueryDescription, QueryPage, Snapshot, StatsSnapshot, TaskKind, WriteOptions, WriteTask,
    DEFAULT_QUERY_LIMIT, DELETE_SENTINEL, INCREMENT_SENTINEL,
};
pub use store::{DocumentStore, ListenerHandle, ListenerSink, MemoryStore};
pub use subscription::{LiveDocument, LiveQuery, SubscriptionHandle};
pub use validate::{AcceptAll, SchemaValidator, ValidationOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
