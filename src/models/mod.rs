//! Data models for the doclink client library.
//!
//! Defines the declarative query description, mutation task descriptors,
//! update-payload value trees, and the snapshot/page shapes returned by
//! reads and live subscriptions.

pub mod document;
pub mod field_value;
pub mod filter;
pub mod options;
pub mod order;
pub mod path_spec;
pub mod query_description;
pub mod query_page;
pub mod snapshot;
pub mod stats_snapshot;
pub mod task;

pub use document::Document;
pub use field_value::{FieldValue, DELETE_SENTINEL, INCREMENT_SENTINEL};
pub use filter::{FilterClause, FilterOp};
pub use options::{GetOptions, WriteOptions};
pub use order::{Direction, OrderClause};
pub use path_spec::PathSpec;
pub use query_description::{QueryDescription, DEFAULT_QUERY_LIMIT};
pub use query_page::QueryPage;
pub use snapshot::Snapshot;
pub use stats_snapshot::StatsSnapshot;
pub use task::{TaskKind, WriteTask};
