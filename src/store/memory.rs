//! In-memory reference implementation of [`DocumentStore`].
//!
//! Backs the test suites and doubles as an executable specification of the
//! collaborator contract: filter/sort/cursor/limit query evaluation,
//! recursive merge and targeted field writes with delete/increment
//! directives, atomic batch commit, and synchronous listener notification
//! after every commit.

use crate::error::{DocLinkError, Result};
use crate::models::{Direction, Document, FilterOp, Snapshot};
use crate::store::{
    CompiledQuery, DocumentStore, ListenerHandle, ListenerSink, StoreValue, WriteBatch, WriteOp,
};
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

type Collections = HashMap<String, BTreeMap<String, Value>>;

enum ListenerTarget {
    Query(CompiledQuery),
    Doc { collection: String, id: String },
}

impl ListenerTarget {
    fn collection(&self) -> &str {
        match self {
            ListenerTarget::Query(query) => &query.collection,
            ListenerTarget::Doc { collection, .. } => collection,
        }
    }
}

struct ListenerEntry {
    target: ListenerTarget,
    sink: ListenerSink,
}

struct Inner {
    collections: RwLock<Collections>,
    listeners: RwLock<HashMap<u64, ListenerEntry>>,
    next_listener_id: AtomicU64,
}

/// In-memory document store with live listener support.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                listeners: RwLock::new(HashMap::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of currently attached listeners; used by tests to assert the
    /// multiplexer's deduplication behavior.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    /// Raw payload of one document, if present. Test helper.
    pub fn raw_document(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.inner.collections.read().ok()?;
        collections.get(collection)?.get(id).cloned()
    }

    fn snapshot_for(&self, target: &ListenerTarget, collections: &Collections) -> Snapshot {
        match target {
            ListenerTarget::Query(query) => Snapshot::Query(eval_query(collections, query)),
            ListenerTarget::Doc { collection, id } => Snapshot::Document(
                collections
                    .get(collection)
                    .and_then(|docs| docs.get(id))
                    .map(|data| Document::new(id.clone(), data.clone())),
            ),
        }
    }

    /// Recompute and deliver snapshots for every listener watching one of the
    /// touched collections.
    fn notify(&self, touched: &HashSet<String>) {
        let deliveries: Vec<(ListenerSink, Snapshot)> = {
            let listeners = match self.inner.listeners.read() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let collections = match self.inner.collections.read() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            listeners
                .values()
                .filter(|entry| touched.contains(entry.target.collection()))
                .map(|entry| {
                    (
                        entry.sink.clone(),
                        self.snapshot_for(&entry.target, &collections),
                    )
                })
                .collect()
        };
        for (sink, snapshot) in deliveries {
            (sink.on_change)(snapshot);
        }
    }

    fn register_listener(&self, target: ListenerTarget, sink: ListenerSink) -> Result<u64> {
        let id = self
            .inner
            .next_listener_id
            .fetch_add(1, AtomicOrdering::Relaxed);
        let initial = {
            let collections = read_guard(&self.inner.collections)?;
            self.snapshot_for(&target, &collections)
        };
        {
            let mut listeners = write_guard(&self.inner.listeners)?;
            listeners.insert(id, ListenerEntry { target, sink: sink.clone() });
        }
        // Deliver the current state immediately, before any commit-driven
        // notification can arrive for this listener.
        (sink.on_change)(initial);
        Ok(id)
    }
}

struct MemoryListenerHandle {
    id: u64,
    inner: Arc<Inner>,
}

impl ListenerHandle for MemoryListenerHandle {
    fn cancel(&self) {
        if let Ok(mut listeners) = self.inner.listeners.write() {
            if listeners.remove(&self.id).is_some() {
                debug!("[MEMORY_STORE] listener {} cancelled", self.id);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = read_guard(&self.inner.collections)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn run_query(&self, query: &CompiledQuery) -> Result<Vec<Document>> {
        let collections = read_guard(&self.inner.collections)?;
        Ok(eval_query(&collections, query))
    }

    async fn listen_query(
        &self,
        query: &CompiledQuery,
        sink: ListenerSink,
    ) -> Result<Box<dyn ListenerHandle>> {
        let id = self.register_listener(ListenerTarget::Query(query.clone()), sink)?;
        Ok(Box::new(MemoryListenerHandle {
            id,
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn listen_doc(
        &self,
        collection: &str,
        id: &str,
        sink: ListenerSink,
    ) -> Result<Box<dyn ListenerHandle>> {
        let target = ListenerTarget::Doc {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let id = self.register_listener(target, sink)?;
        Ok(Box::new(MemoryListenerHandle {
            id,
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut touched = HashSet::new();
        {
            let mut collections = write_guard(&self.inner.collections)?;
            for op in &batch.ops {
                touched.insert(op.collection().to_string());
                apply_op(&mut collections, op);
            }
        }
        debug!(
            "[MEMORY_STORE] committed {} ops across {} collections",
            batch.len(),
            touched.len()
        );
        self.notify(&touched);
        Ok(())
    }
}

fn read_guard<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| DocLinkError::InternalError(e.to_string()))
}

fn write_guard<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| DocLinkError::InternalError(e.to_string()))
}

// ── write application ───────────────────────────────────────────────────────

fn apply_op(collections: &mut Collections, op: &WriteOp) {
    match op {
        WriteOp::Set {
            collection,
            id,
            data,
        } => {
            collections
                .entry(collection.clone())
                .or_default()
                .insert(id.clone(), data.clone());
        }
        WriteOp::Merge {
            collection,
            id,
            fields,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            let existing = docs.get(id);
            let merged = apply_merge_value(existing, fields).unwrap_or(Value::Object(Map::new()));
            docs.insert(id.clone(), merged);
        }
        WriteOp::SetField {
            collection,
            id,
            path,
            value,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            let mut data = docs
                .get(id)
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            set_at_path(&mut data, path, value);
            docs.insert(id.clone(), data);
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(id);
            }
        }
    }
}

/// Merge semantics: maps merge field-by-field into the existing value,
/// preserving unlisted fields; delete removes; increment adds to the existing
/// number (or starts from zero). Returns `None` when the result is "no value".
fn apply_merge_value(existing: Option<&Value>, value: &StoreValue) -> Option<Value> {
    match value {
        StoreValue::Literal(v) => Some(v.clone()),
        StoreValue::DeleteField => None,
        StoreValue::Increment(by) => Some(incremented(existing, *by)),
        StoreValue::Map(fields) => {
            let mut obj = existing
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            for (key, sub) in fields {
                match apply_merge_value(obj.get(key), sub) {
                    Some(new_value) => {
                        obj.insert(key.clone(), new_value);
                    }
                    None => {
                        obj.remove(key);
                    }
                }
            }
            Some(Value::Object(obj))
        }
    }
}

/// Destructive set semantics: maps build a fresh object (no merging with the
/// previous value), so previously existing siblings are gone. Delete and
/// increment directives still resolve against the old value at their spot.
fn apply_set_value(existing: Option<&Value>, value: &StoreValue) -> Option<Value> {
    match value {
        StoreValue::Literal(v) => Some(v.clone()),
        StoreValue::DeleteField => None,
        StoreValue::Increment(by) => Some(incremented(existing, *by)),
        StoreValue::Map(fields) => {
            let old = existing.and_then(|v| v.as_object());
            let mut obj = Map::new();
            for (key, sub) in fields {
                if let Some(new_value) = apply_set_value(old.and_then(|o| o.get(key)), sub) {
                    obj.insert(key.clone(), new_value);
                }
            }
            Some(Value::Object(obj))
        }
    }
}

fn incremented(existing: Option<&Value>, by: i64) -> Value {
    let current = existing.and_then(Value::as_i64).unwrap_or(0);
    Value::from(current + by)
}

/// Apply a destructive write at a dotted path, creating intermediate objects
/// as needed.
fn set_at_path(data: &mut Value, path: &str, value: &StoreValue) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut cursor = data;
    for segment in &segments[..segments.len() - 1] {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Some(map) = cursor.as_object_mut() else {
            return;
        };
        cursor = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let leaf = segments[segments.len() - 1];
    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    let Some(map) = cursor.as_object_mut() else {
        return;
    };
    match apply_set_value(map.get(leaf), value) {
        Some(new_value) => {
            map.insert(leaf.to_string(), new_value);
        }
        None => {
            map.remove(leaf);
        }
    }
}

// ── query evaluation ────────────────────────────────────────────────────────

fn eval_query(collections: &Collections, query: &CompiledQuery) -> Vec<Document> {
    let Some(docs) = collections.get(&query.collection) else {
        return Vec::new();
    };

    let mut matched: Vec<Document> = docs
        .iter()
        .filter(|(_, data)| query.filters.iter().all(|f| matches_filter(data, f)))
        .map(|(id, data)| Document::new(id.clone(), data.clone()))
        .collect();

    matched.sort_by(|a, b| compare_docs(a, b, &query.order_by));

    if let Some(anchor) = &query.start_after {
        let anchor_key = sort_key(anchor, &query.order_by);
        matched.retain(|doc| {
            compare_keys(
                &sort_key(doc, &query.order_by),
                &doc.id,
                &anchor_key,
                &anchor.id,
                &query.order_by,
            ) == Ordering::Greater
        });
    } else if let Some(start) = &query.start_at {
        matched.retain(|doc| {
            compare_prefix(&sort_key(doc, &query.order_by), start, &query.order_by)
                != Ordering::Less
        });
    }

    if let Some(end) = &query.end_at {
        matched.retain(|doc| {
            compare_prefix(&sort_key(doc, &query.order_by), end, &query.order_by)
                != Ordering::Greater
        });
    }

    matched.truncate(query.limit);
    matched
}

fn matches_filter(data: &Value, filter: &crate::store::CompiledFilter) -> bool {
    let Some(actual) = value_at_path(data, &filter.path) else {
        return false;
    };
    match filter.op {
        FilterOp::Equal => actual == &filter.value,
        FilterOp::LessThan => compare_values(actual, &filter.value) == Ordering::Less,
        FilterOp::LessThanOrEqual => compare_values(actual, &filter.value) != Ordering::Greater,
        FilterOp::GreaterThan => compare_values(actual, &filter.value) == Ordering::Greater,
        FilterOp::GreaterThanOrEqual => compare_values(actual, &filter.value) != Ordering::Less,
        FilterOp::ArrayContains => actual
            .as_array()
            .map(|items| items.contains(&filter.value))
            .unwrap_or(false),
    }
}

fn value_at_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = data;
    for segment in path.split('.') {
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor)
}

/// Order-by field values of a document, one per clause; missing fields rank
/// as null.
fn sort_key(doc: &Document, order_by: &[crate::store::CompiledOrder]) -> Vec<Value> {
    order_by
        .iter()
        .map(|clause| {
            value_at_path(&doc.data, &clause.path)
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect()
}

fn compare_docs(a: &Document, b: &Document, order_by: &[crate::store::CompiledOrder]) -> Ordering {
    compare_keys(
        &sort_key(a, order_by),
        &a.id,
        &sort_key(b, order_by),
        &b.id,
        order_by,
    )
}

/// Component-wise comparison with per-clause direction; ties broken by id
/// ascending so pagination cursors are stable.
fn compare_keys(
    a_key: &[Value],
    a_id: &str,
    b_key: &[Value],
    b_id: &str,
    order_by: &[crate::store::CompiledOrder],
) -> Ordering {
    for (index, clause) in order_by.iter().enumerate() {
        let ordering = compare_values(&a_key[index], &b_key[index]);
        let ordering = match clause.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a_id.cmp(b_id)
}

/// Compare a document's key against an explicit cursor tuple, which may be a
/// prefix of the order-by clauses.
fn compare_prefix(
    key: &[Value],
    cursor: &[Value],
    order_by: &[crate::store::CompiledOrder],
) -> Ordering {
    for (index, cursor_value) in cursor.iter().enumerate() {
        let Some(component) = key.get(index) else {
            break;
        };
        let ordering = compare_values(component, cursor_value);
        let ordering = match order_by.get(index).map(|c| c.direction) {
            Some(Direction::Descending) => ordering.reverse(),
            _ => ordering,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values: null < bool < number < string < array <
/// object, with natural ordering inside each type.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CompiledFilter, CompiledOrder};
    use serde_json::json;

    fn store_value_map(pairs: Vec<(&str, StoreValue)>) -> StoreValue {
        StoreValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn query(collection: &str, limit: usize) -> CompiledQuery {
        CompiledQuery {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit,
            start_at: None,
            start_after: None,
            end_at: None,
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for (id, age) in [("a", 30), ("b", 25), ("c", 35), ("d", 25)] {
            batch.push(WriteOp::Set {
                collection: "users".into(),
                id: id.into(),
                data: json!({"id": id, "age": age, "favFoods": {"asian": "ramen"}}),
            });
        }
        store.commit(batch).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_merge_preserves_unlisted_fields() {
        let store = seeded_store().await;
        let fields = store_value_map(vec![(
            "favFoods",
            store_value_map(vec![("american", StoreValue::Literal(json!("burger")))]),
        )]);
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Merge {
            collection: "users".into(),
            id: "a".into(),
            fields,
        });
        store.commit(batch).await.unwrap();

        let data = store.raw_document("users", "a").unwrap();
        assert_eq!(data["favFoods"]["asian"], json!("ramen"));
        assert_eq!(data["favFoods"]["american"], json!("burger"));
        assert_eq!(data["age"], json!(30));
    }

    #[tokio::test]
    async fn test_merge_delete_and_increment() {
        let store = seeded_store().await;
        let fields = store_value_map(vec![
            (
                "favFoods",
                store_value_map(vec![("asian", StoreValue::DeleteField)]),
            ),
            ("age", StoreValue::Increment(1)),
            ("visits", StoreValue::Increment(1)),
        ]);
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Merge {
            collection: "users".into(),
            id: "a".into(),
            fields,
        });
        store.commit(batch).await.unwrap();

        let data = store.raw_document("users", "a").unwrap();
        assert_eq!(data["favFoods"], json!({}));
        assert_eq!(data["age"], json!(31));
        assert_eq!(data["visits"], json!(1));
    }

    #[tokio::test]
    async fn test_set_field_is_destructive() {
        let store = seeded_store().await;
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::SetField {
            collection: "users".into(),
            id: "a".into(),
            path: "favFoods".into(),
            value: store_value_map(vec![("american", StoreValue::Literal(json!("burger")))]),
        });
        store.commit(batch).await.unwrap();

        let data = store.raw_document("users", "a").unwrap();
        assert_eq!(data["favFoods"], json!({"american": "burger"}));
    }

    #[tokio::test]
    async fn test_query_filter_sort_limit() {
        let store = seeded_store().await;
        let mut q = query("users", 10);
        q.filters.push(CompiledFilter {
            path: "age".into(),
            op: FilterOp::GreaterThanOrEqual,
            value: json!(25),
        });
        q.order_by.push(CompiledOrder {
            path: "age".into(),
            direction: Direction::Descending,
        });
        let docs = store.run_query(&q).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        // age desc, ties by id asc
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }

    #[tokio::test]
    async fn test_query_start_after_anchor() {
        let store = seeded_store().await;
        let mut q = query("users", 2);
        q.order_by.push(CompiledOrder {
            path: "age".into(),
            direction: Direction::Ascending,
        });
        let first = store.run_query(&q).await.unwrap();
        assert_eq!(first.len(), 2);

        let mut q2 = q.clone();
        q2.start_after = Some(first.last().unwrap().clone());
        let second = store.run_query(&q2).await.unwrap();
        assert_eq!(second.len(), 2);

        let mut seen: Vec<String> = first.into_iter().chain(second).map(|d| d.id).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let store = seeded_store().await;
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Delete {
            collection: "users".into(),
            id: "a".into(),
        });
        store.commit(batch).await.unwrap();
        assert!(store.raw_document("users", "a").is_none());
    }

    #[tokio::test]
    async fn test_listener_fires_on_commit_and_cancel_stops_it() {
        let store = seeded_store().await;
        let seen = Arc::new(RwLock::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = ListenerSink {
            on_change: Arc::new(move |snapshot: Snapshot| {
                seen_clone.write().unwrap().push(snapshot);
            }),
            on_error: Arc::new(|_| {}),
        };
        let handle = store
            .listen_doc("users", "a", sink)
            .await
            .unwrap();
        assert_eq!(seen.read().unwrap().len(), 1, "initial snapshot expected");

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Set {
            collection: "users".into(),
            id: "a".into(),
            data: json!({"id": "a", "age": 40}),
        });
        store.commit(batch.clone()).await.unwrap();
        assert_eq!(seen.read().unwrap().len(), 2);

        handle.cancel();
        assert_eq!(store.listener_count(), 0);
        store.commit(batch).await.unwrap();
        assert_eq!(seen.read().unwrap().len(), 2, "no delivery after cancel");
    }
}
