//! Subscription multiplexing.
//!
//! One backend listener per distinct fingerprint, no matter how many callers
//! subscribe. The registry keeps a subscriber list and the last delivered
//! snapshot per fingerprint: late subscribers get the cached snapshot
//! replayed immediately, new snapshots are broadcast to every subscriber, and
//! the backend listener is torn down when the last subscriber leaves.
//!
//! Instance-scoped: two clients never share a registry, and `close` releases
//! every listener at once.

use crate::error::{DocLinkError, Result};
use crate::models::{Document, Snapshot};
use crate::store::{
    CompiledQuery, DocumentStore, ErrorCallback, ListenerHandle, ListenerSink, SnapshotCallback,
};
use log::{debug, error, warn};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

struct Subscriber {
    on_data: SnapshotCallback,
    on_error: Option<ErrorCallback>,
}

enum ListenerState {
    /// Attach call in flight; no backend handle yet
    Pending,
    Active(Box<dyn ListenerHandle>),
}

struct RegistryEntry {
    listener: ListenerState,
    subscribers: BTreeMap<u64, Subscriber>,
    last_value: Option<Snapshot>,
}

/// Fingerprint-keyed registry of shared backend listeners.
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
    next_handle_id: AtomicU64,
    subscriptions_created: AtomicU64,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_handle_id: AtomicU64::new(1),
            subscriptions_created: AtomicU64::new(0),
        }
    }

    /// Register a subscriber under a fingerprint, attaching a backend
    /// listener through `attach` only when the fingerprint is new.
    ///
    /// The cached last snapshot, if any, is replayed to the new subscriber
    /// alone before this returns.
    pub async fn subscribe<F, Fut>(
        self: &Arc<Self>,
        fingerprint: &str,
        on_data: SnapshotCallback,
        on_error: Option<ErrorCallback>,
        attach: F,
    ) -> Result<SubscriptionHandle>
    where
        F: FnOnce(ListenerSink) -> Fut,
        Fut: Future<Output = Result<Box<dyn ListenerHandle>>>,
    {
        let handle_id = self.next_handle_id.fetch_add(1, Ordering::Relaxed);
        let subscriber = Subscriber {
            on_data: Arc::clone(&on_data),
            on_error,
        };

        let (must_attach, replay) = {
            let mut entries = self.entries_mut()?;
            match entries.get_mut(fingerprint) {
                Some(entry) => {
                    entry.subscribers.insert(handle_id, subscriber);
                    (false, entry.last_value.clone())
                }
                None => {
                    let mut subscribers = BTreeMap::new();
                    subscribers.insert(handle_id, subscriber);
                    entries.insert(
                        fingerprint.to_string(),
                        RegistryEntry {
                            listener: ListenerState::Pending,
                            subscribers,
                            last_value: None,
                        },
                    );
                    (true, None)
                }
            }
        };
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);

        if let Some(snapshot) = replay {
            debug!("[SUBSCRIPTION] replaying cached snapshot for '{}'", fingerprint);
            (on_data)(snapshot);
        }

        if must_attach {
            debug!("[SUBSCRIPTION] attaching backend listener for '{}'", fingerprint);
            let sink = self.make_sink(fingerprint);
            match attach(sink).await {
                Ok(handle) => {
                    let stale = {
                        let mut entries = self.entries_mut()?;
                        match entries.get_mut(fingerprint) {
                            Some(entry) if !entry.subscribers.is_empty() => {
                                entry.listener = ListenerState::Active(handle);
                                None
                            }
                            // Everyone left while the attach was in flight.
                            _ => {
                                entries.remove(fingerprint);
                                Some(handle)
                            }
                        }
                    };
                    if let Some(handle) = stale {
                        handle.cancel();
                        return Err(DocLinkError::InternalError(format!(
                            "subscription '{}' cancelled before the listener attached",
                            fingerprint
                        )));
                    }
                }
                Err(e) => {
                    let removed = {
                        let mut entries = self.entries_mut()?;
                        entries.remove(fingerprint)
                    };
                    if let Some(entry) = removed {
                        for subscriber in entry.subscribers.values() {
                            if let Some(on_error) = &subscriber.on_error {
                                (on_error)(e.clone());
                            }
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(SubscriptionHandle {
            fingerprint: fingerprint.to_string(),
            handle_id,
            registry: Arc::downgrade(self),
            done: AtomicBool::new(false),
        })
    }

    /// Sink handed to the backend: snapshots broadcast to every current
    /// subscriber, errors fan out to the error callbacks.
    fn make_sink(self: &Arc<Self>, fingerprint: &str) -> ListenerSink {
        let registry = Arc::clone(self);
        let key = fingerprint.to_string();
        let on_change: SnapshotCallback = {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            Arc::new(move |snapshot: Snapshot| {
                registry.broadcast(&key, snapshot);
            })
        };
        let on_error: ErrorCallback = Arc::new(move |err: DocLinkError| {
            registry.fan_out_error(&key, err);
        });
        ListenerSink {
            on_change,
            on_error,
        }
    }

    /// Cache the snapshot and deliver it to every subscriber. Callbacks run
    /// outside the registry lock.
    fn broadcast(&self, fingerprint: &str, snapshot: Snapshot) {
        let callbacks: Vec<SnapshotCallback> = {
            let mut entries = match self.entries.write() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let Some(entry) = entries.get_mut(fingerprint) else {
                return;
            };
            entry.last_value = Some(snapshot.clone());
            entry
                .subscribers
                .values()
                .map(|s| Arc::clone(&s.on_data))
                .collect()
        };
        for callback in callbacks {
            (callback)(snapshot.clone());
        }
    }

    fn fan_out_error(&self, fingerprint: &str, err: DocLinkError) {
        let callbacks: Vec<ErrorCallback> = {
            let entries = match self.entries.read() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            match entries.get(fingerprint) {
                Some(entry) => entry
                    .subscribers
                    .values()
                    .filter_map(|s| s.on_error.as_ref().map(Arc::clone))
                    .collect(),
                None => Vec::new(),
            }
        };
        if callbacks.is_empty() {
            error!("[SUBSCRIPTION] unhandled error on '{}': {}", fingerprint, err);
            return;
        }
        for callback in callbacks {
            (callback)(err.clone());
        }
    }

    /// Remove one subscriber. Tears the backend listener down when it was the
    /// last one; unknown handles are a logged no-op.
    pub fn unsubscribe(&self, fingerprint: &str, handle_id: u64) {
        let orphaned = {
            let mut entries = match self.entries.write() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let Some(entry) = entries.get_mut(fingerprint) else {
                warn!(
                    "[SUBSCRIPTION] unsubscribe for unknown fingerprint '{}'",
                    fingerprint
                );
                return;
            };
            if entry.subscribers.remove(&handle_id).is_none() {
                warn!(
                    "[SUBSCRIPTION] unsubscribe for unknown handle {} on '{}'",
                    handle_id, fingerprint
                );
                return;
            }
            if entry.subscribers.is_empty() {
                entries.remove(fingerprint)
            } else {
                None
            }
        };
        if let Some(entry) = orphaned {
            debug!("[SUBSCRIPTION] last subscriber left '{}', tearing down", fingerprint);
            if let ListenerState::Active(handle) = entry.listener {
                handle.cancel();
            }
        }
    }

    /// Drop every subscription and cancel every backend listener.
    pub fn close(&self) {
        let drained: Vec<RegistryEntry> = {
            let mut entries = match self.entries.write() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            entries.drain().map(|(_, entry)| entry).collect()
        };
        debug!("[SUBSCRIPTION] closing {} active fingerprints", drained.len());
        for entry in drained {
            if let ListenerState::Active(handle) = entry.listener {
                handle.cancel();
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn subscriptions_created(&self) -> u64 {
        self.subscriptions_created.load(Ordering::Relaxed)
    }

    pub fn subscribers_per_fingerprint(&self) -> BTreeMap<String, usize> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), entry.subscribers.len()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn entries_mut(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, RegistryEntry>>> {
        self.entries
            .write()
            .map_err(|e| DocLinkError::InternalError(e.to_string()))
    }
}

/// Caller-side handle for one subscription. Unsubscribes on drop; explicit
/// [`SubscriptionHandle::unsubscribe`] is idempotent.
pub struct SubscriptionHandle {
    fingerprint: String,
    handle_id: u64,
    registry: Weak<SubscriptionRegistry>,
    done: AtomicBool,
}

impl SubscriptionHandle {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(&self.fingerprint, self.handle_id);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ── typed subscription surfaces ─────────────────────────────────────────────

/// Live view over a compiled query, produced by
/// [`crate::CollectionClient::query_subscribe`].
pub struct LiveQuery {
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) fingerprint: String,
    pub(crate) query: CompiledQuery,
}

impl LiveQuery {
    /// Subscribe with a result-set callback; backend errors are logged.
    pub async fn subscribe<F>(&self, on_data: F) -> Result<SubscriptionHandle>
    where
        F: Fn(Vec<Document>) + Send + Sync + 'static,
    {
        self.subscribe_inner(on_data, None).await
    }

    /// Subscribe with both a result-set callback and an error callback.
    pub async fn subscribe_with_errors<F, E>(
        &self,
        on_data: F,
        on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(Vec<Document>) + Send + Sync + 'static,
        E: Fn(DocLinkError) + Send + Sync + 'static,
    {
        self.subscribe_inner(on_data, Some(Arc::new(on_error) as ErrorCallback))
            .await
    }

    async fn subscribe_inner<F>(
        &self,
        on_data: F,
        on_error: Option<ErrorCallback>,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(Vec<Document>) + Send + Sync + 'static,
    {
        let on_snapshot: SnapshotCallback = Arc::new(move |snapshot: Snapshot| {
            if let Snapshot::Query(docs) = snapshot {
                on_data(docs);
            }
        });
        let store = Arc::clone(&self.store);
        let query = self.query.clone();
        self.registry
            .subscribe(&self.fingerprint, on_snapshot, on_error, move |sink| {
                let store = Arc::clone(&store);
                async move { store.listen_query(&query, sink).await }
            })
            .await
    }
}

/// Live view over a single document, produced by
/// [`crate::CollectionClient::doc_subscribe`].
pub struct LiveDocument {
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) fingerprint: String,
    pub(crate) collection: String,
    pub(crate) id: String,
}

impl LiveDocument {
    /// Subscribe with a document callback; `None` means the document is
    /// absent. Backend errors are logged.
    pub async fn subscribe<F>(&self, on_data: F) -> Result<SubscriptionHandle>
    where
        F: Fn(Option<Document>) + Send + Sync + 'static,
    {
        self.subscribe_inner(on_data, None).await
    }

    /// Subscribe with both a document callback and an error callback.
    pub async fn subscribe_with_errors<F, E>(
        &self,
        on_data: F,
        on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(Option<Document>) + Send + Sync + 'static,
        E: Fn(DocLinkError) + Send + Sync + 'static,
    {
        self.subscribe_inner(on_data, Some(Arc::new(on_error) as ErrorCallback))
            .await
    }

    async fn subscribe_inner<F>(
        &self,
        on_data: F,
        on_error: Option<ErrorCallback>,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(Option<Document>) + Send + Sync + 'static,
    {
        let on_snapshot: SnapshotCallback = Arc::new(move |snapshot: Snapshot| {
            if let Snapshot::Document(doc) = snapshot {
                on_data(doc);
            }
        });
        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();
        let id = self.id.clone();
        self.registry
            .subscribe(&self.fingerprint, on_snapshot, on_error, move |sink| {
                let store = Arc::clone(&store);
                async move { store.listen_doc(&collection, &id, sink).await }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeHandle {
        cancelled: Arc<AtomicBool>,
    }

    impl ListenerHandle for FakeHandle {
        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    fn collector() -> (SnapshotCallback, Arc<Mutex<Vec<Snapshot>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let callback: SnapshotCallback = Arc::new(move |snapshot| {
            seen_clone.lock().unwrap().push(snapshot);
        });
        (callback, seen)
    }

    fn fake_attach(
        cancelled: Arc<AtomicBool>,
        sinks: Arc<Mutex<Vec<ListenerSink>>>,
    ) -> impl FnOnce(ListenerSink) -> std::future::Ready<Result<Box<dyn ListenerHandle>>> {
        move |sink| {
            sinks.lock().unwrap().push(sink);
            std::future::ready(Ok(Box::new(FakeHandle { cancelled }) as Box<dyn ListenerHandle>))
        }
    }

    #[tokio::test]
    async fn test_second_subscriber_reuses_the_listener_and_gets_replay() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let (first_cb, first_seen) = collector();
        let _first = registry
            .subscribe(
                "query:users:1",
                first_cb,
                None,
                fake_attach(Arc::clone(&cancelled), Arc::clone(&sinks)),
            )
            .await
            .unwrap();
        assert_eq!(sinks.lock().unwrap().len(), 1);

        // Backend delivers a snapshot; both sides of the fan-out observe it.
        let sink = sinks.lock().unwrap()[0].clone();
        (sink.on_change)(Snapshot::Query(Vec::new()));
        assert_eq!(first_seen.lock().unwrap().len(), 1);

        // Attach must not run again for a known fingerprint, so an erroring
        // attach proves reuse.
        let (second_cb, second_seen) = collector();
        let _second = registry
            .subscribe("query:users:1", second_cb, None, |_sink| {
                std::future::ready(Err(DocLinkError::InternalError("must not attach".into())))
            })
            .await
            .unwrap();

        // No second backend listener; the cached snapshot was replayed.
        assert_eq!(sinks.lock().unwrap().len(), 1);
        assert_eq!(second_seen.lock().unwrap().len(), 1);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.subscriptions_created(), 2);
    }

    #[tokio::test]
    async fn test_last_unsubscribe_cancels_the_listener() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let (cb1, _) = collector();
        let (cb2, _) = collector();
        let first = registry
            .subscribe(
                "doc:users/u1",
                cb1,
                None,
                fake_attach(Arc::clone(&cancelled), Arc::clone(&sinks)),
            )
            .await
            .unwrap();
        let second = registry
            .subscribe("doc:users/u1", cb2, None, |_sink| {
                std::future::ready(Err(DocLinkError::InternalError("unused".into())))
            })
            .await
            .unwrap();

        first.unsubscribe();
        assert!(!cancelled.load(Ordering::SeqCst), "one subscriber remains");
        assert_eq!(registry.active_count(), 1);

        second.unsubscribe();
        assert!(cancelled.load(Ordering::SeqCst));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let (cb, _) = collector();
        let handle = registry
            .subscribe(
                "doc:users/u1",
                cb,
                None,
                fake_attach(Arc::clone(&cancelled), Arc::clone(&sinks)),
            )
            .await
            .unwrap();
        drop(handle);
        assert!(cancelled.load(Ordering::SeqCst));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_attach_failure_cleans_up_and_surfaces() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_clone = Arc::clone(&errors);
        let on_error: ErrorCallback = Arc::new(move |e| {
            errors_clone.lock().unwrap().push(e);
        });

        let (cb, _) = collector();
        let result = registry
            .subscribe("query:bad:0", cb, Some(on_error), |_sink| {
                std::future::ready(Err(DocLinkError::StoreError("refused".into())))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(errors.lock().unwrap().len(), 1);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_errors_fan_out_to_error_callbacks() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_clone = Arc::clone(&errors);
        let on_error: ErrorCallback = Arc::new(move |e| {
            errors_clone.lock().unwrap().push(e);
        });

        let (cb, _) = collector();
        let _handle = registry
            .subscribe(
                "doc:users/u1",
                cb,
                Some(on_error),
                fake_attach(Arc::clone(&cancelled), Arc::clone(&sinks)),
            )
            .await
            .unwrap();

        let sink = sinks.lock().unwrap()[0].clone();
        (sink.on_error)(DocLinkError::StoreError("connection lost".into()));
        assert_eq!(errors.lock().unwrap().len(), 1);
        // The subscription stays registered after an error.
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_close_tears_everything_down() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let (cb, _) = collector();
        let handle = registry
            .subscribe(
                "doc:users/u1",
                cb,
                None,
                fake_attach(Arc::clone(&cancelled), Arc::clone(&sinks)),
            )
            .await
            .unwrap();

        registry.close();
        assert!(cancelled.load(Ordering::SeqCst));
        assert_eq!(registry.active_count(), 0);

        // Late unsubscribe after close is a no-op.
        handle.unsubscribe();
    }
}
