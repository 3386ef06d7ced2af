//! External collaborator interface: the remote document store.
//!
//! The store's consistency model, storage engine, and transport are not part
//! of this crate; everything is consumed through [`DocumentStore`]. The trait
//! covers collection-scoped get-by-id, compiled-query execution, live
//! listener registration returning a cancel handle, and atomic
//! multi-operation batch commit with field-level directives.

pub mod memory;

use crate::error::{DocLinkError, Result};
use crate::models::{Direction, Document, FilterOp, Snapshot};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use memory::MemoryStore;

/// Backend-native query handle produced by the query compiler. All paths are
/// resolved to dotted strings and the continuation anchor, if any, has been
/// fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub collection: String,
    pub filters: Vec<CompiledFilter>,
    pub order_by: Vec<CompiledOrder>,
    /// Always concrete; the default cap is applied during compilation
    pub limit: usize,
    /// Explicit start-cursor values; absent whenever `start_after` is set
    pub start_at: Option<Vec<Value>>,
    /// Continuation anchor: results begin strictly after this document
    pub start_after: Option<Document>,
    /// Inclusive end-cursor values
    pub end_at: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub path: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOrder {
    pub path: String,
    pub direction: Direction,
}

/// Backend directive tree for partial writes: literal values, recursive
/// patches, field removal, and atomic increments.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Literal(Value),
    Map(BTreeMap<String, StoreValue>),
    DeleteField,
    Increment(i64),
}

/// One resolved write operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Full-document write (create or replace)
    Set {
        collection: String,
        id: String,
        data: Value,
    },
    /// Recursive field-by-field merge into the existing document
    Merge {
        collection: String,
        id: String,
        fields: StoreValue,
    },
    /// Targeted destructive write of a single dotted field path
    SetField {
        collection: String,
        id: String,
        path: String,
        value: StoreValue,
    },
    /// Whole-document removal
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Set { collection, .. }
            | WriteOp::Merge { collection, .. }
            | WriteOp::SetField { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// An ordered list of write operations committed as one atomic unit: either
/// every operation takes effect or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Callback invoked with each new snapshot of a live query or document.
pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Callback invoked when the backend reports an error for a listener.
pub type ErrorCallback = Arc<dyn Fn(DocLinkError) + Send + Sync>;

/// Delivery target handed to the store when attaching a listener.
#[derive(Clone)]
pub struct ListenerSink {
    pub on_change: SnapshotCallback,
    pub on_error: ErrorCallback,
}

/// Cancel handle for a live listener. `cancel` is synchronous and idempotent;
/// after it returns, no further events are delivered through the sink.
pub trait ListenerHandle: Send + Sync {
    fn cancel(&self);
}

/// The remote document store, consumed as an interface only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document by id; `Ok(None)` when absent.
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Execute a compiled query and return the matching documents in order.
    async fn run_query(&self, query: &CompiledQuery) -> Result<Vec<Document>>;

    /// Attach a live listener for a compiled query. The sink receives the
    /// current result set immediately and again after every relevant commit.
    async fn listen_query(
        &self,
        query: &CompiledQuery,
        sink: ListenerSink,
    ) -> Result<Box<dyn ListenerHandle>>;

    /// Attach a live listener for a single document.
    async fn listen_doc(
        &self,
        collection: &str,
        id: &str,
        sink: ListenerSink,
    ) -> Result<Box<dyn ListenerHandle>>;

    /// Commit a write batch atomically: all-or-nothing.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}
