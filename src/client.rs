//! Client entry point.
//!
//! A [`DocLinkClient`] owns one subscription registry, one stats block, and
//! shared handles to the store, validator, and id generator collaborators.
//! Two clients over the same store are fully independent: closing one never
//! touches the other's subscriptions.

use crate::batch;
use crate::collection::CollectionClient;
use crate::error::{DocLinkError, Result};
use crate::ids::{IdGenerator, TimestampIdGenerator};
use crate::models::{StatsSnapshot, WriteTask};
use crate::stats::Stats;
use crate::store::DocumentStore;
use crate::subscription::SubscriptionRegistry;
use crate::validate::{AcceptAll, SchemaValidator};
use log::{debug, info};
use std::sync::Arc;

pub(crate) struct ClientInner {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) validator: Arc<dyn SchemaValidator>,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) stats: Stats,
    pub(crate) auto_generate_ids: bool,
}

impl ClientInner {
    pub(crate) async fn commit_tasks(&self, tasks: &[WriteTask]) -> Result<()> {
        let compiled = batch::compile_batch(tasks, self.validator.as_ref())?;
        if compiled.is_empty() {
            debug!("[CLIENT] batch compiled to zero ops, skipping commit");
            return Ok(());
        }
        let ops = compiled.len() as u64;
        self.store.commit(compiled).await?;
        self.stats.record_written(ops);
        Ok(())
    }
}

/// Typed access layer over a remote document store.
///
/// # Examples
///
/// ```rust,no_run
/// use doclink::{DocLinkClient, MemoryStore, WriteOptions};
/// use serde_json::json;
///
/// # async fn run() -> doclink::Result<()> {
/// let client = DocLinkClient::builder()
///     .store(MemoryStore::new())
///     .build()?;
/// let users = client.collection("users");
/// users
///     .add(json!({"id": "u1", "name": "alice"}), WriteOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DocLinkClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for DocLinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocLinkClient")
            .field("auto_generate_ids", &self.inner.auto_generate_ids)
            .finish_non_exhaustive()
    }
}

impl DocLinkClient {
    /// Client over a store with default validator and id generator.
    pub fn new(store: impl DocumentStore + 'static) -> Self {
        Self::from_inner(
            Arc::new(store),
            Arc::new(AcceptAll),
            Arc::new(TimestampIdGenerator::new()),
            true,
        )
    }

    pub fn builder() -> DocLinkClientBuilder {
        DocLinkClientBuilder::default()
    }

    fn from_inner(
        store: Arc<dyn DocumentStore>,
        validator: Arc<dyn SchemaValidator>,
        id_generator: Arc<dyn IdGenerator>,
        auto_generate_ids: bool,
    ) -> Self {
        info!("[CLIENT] doclink client v{} initialized", crate::VERSION);
        Self {
            inner: Arc::new(ClientInner {
                store,
                validator,
                id_generator,
                registry: Arc::new(SubscriptionRegistry::new()),
                stats: Stats::new(),
                auto_generate_ids,
            }),
        }
    }

    /// Handle for one collection.
    pub fn collection(&self, name: impl Into<String>) -> CollectionClient {
        CollectionClient::new(name.into(), Arc::clone(&self.inner))
    }

    /// Commit a list of deferred tasks as one atomic batch. Empty tasks are
    /// dropped; any compile error aborts before the store sees anything.
    pub async fn commit(&self, tasks: Vec<WriteTask>) -> Result<()> {
        self.inner.commit_tasks(&tasks).await
    }

    /// Point-in-time view of the usage counters.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            documents_fetched: self.inner.stats.documents_fetched(),
            documents_written: self.inner.stats.documents_written(),
            subscriptions_created: self.inner.registry.subscriptions_created(),
            active_subscriptions: self.inner.registry.active_count(),
            subscribers_per_fingerprint: self.inner.registry.subscribers_per_fingerprint(),
        }
    }

    /// Tear down every live subscription owned by this client. The client
    /// remains usable for reads and writes afterwards.
    pub fn close(&self) {
        info!("[CLIENT] closing subscription registry");
        self.inner.registry.close();
    }
}

/// Builder for [`DocLinkClient`]. The store is the only required piece.
#[derive(Default)]
pub struct DocLinkClientBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    validator: Option<Arc<dyn SchemaValidator>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    auto_generate_ids: Option<bool>,
}

impl DocLinkClientBuilder {
    pub fn store(mut self, store: impl DocumentStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn shared_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn id_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    /// Whether `add` may draw ids for payloads without one. Defaults to true.
    pub fn auto_generate_ids(mut self, enabled: bool) -> Self {
        self.auto_generate_ids = Some(enabled);
        self
    }

    pub fn build(self) -> Result<DocLinkClient> {
        let store = self.store.ok_or_else(|| {
            DocLinkError::ConfigurationError("a document store is required".to_string())
        })?;
        Ok(DocLinkClient::from_inner(
            store,
            self.validator.unwrap_or_else(|| Arc::new(AcceptAll)),
            self.id_generator
                .unwrap_or_else(|| Arc::new(TimestampIdGenerator::new())),
            self.auto_generate_ids.unwrap_or(true),
        ))
    }
}
