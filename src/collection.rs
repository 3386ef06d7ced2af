//! Collection-scoped operation surface.
//!
//! Obtained from [`DocLinkClient::collection`](crate::DocLinkClient::collection);
//! cheap to clone and to recreate. Every mutating call resolves to a
//! [`WriteTask`], either committed immediately or returned for atomic
//! batching depending on [`WriteOptions`].

use crate::client::ClientInner;
use crate::error::{DocLinkError, Result};
use crate::fingerprint;
use crate::models::{
    Document, FieldValue, GetOptions, QueryDescription, QueryPage, WriteOptions, WriteTask,
};
use crate::path;
use crate::query;
use crate::subscription::{LiveDocument, LiveQuery};
use crate::validate::ValidationOutcome;
use log::warn;
use serde_json::Value;
use std::sync::Arc;

/// Typed handle for one collection.
#[derive(Clone)]
pub struct CollectionClient {
    name: String,
    inner: Arc<ClientInner>,
}

impl CollectionClient {
    pub(crate) fn new(name: String, inner: Arc<ClientInner>) -> Self {
        Self { name, inner }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draw a fresh document id from the configured generator.
    pub fn generate_id(&self) -> String {
        self.inner.id_generator.generate()
    }

    // ── reads ───────────────────────────────────────────────────────────────

    /// Fetch documents by id.
    ///
    /// By default every id must exist; any miss fails the whole call with an
    /// aggregate error naming all missing ids. With
    /// [`GetOptions::ignore_missing`] the found subset is returned and the
    /// misses are logged. Fetched documents are validated advisorily: a
    /// schema mismatch is logged, never an error.
    pub async fn get(&self, ids: &[&str], options: GetOptions) -> Result<Vec<Document>> {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            match self.inner.store.get_by_id(&self.name, id).await? {
                Some(doc) => {
                    if let ValidationOutcome::Fail(message) =
                        self.inner.validator.validate(&self.name, &doc.data)
                    {
                        warn!(
                            "[COLLECTION] document '{}/{}' fails schema: {}",
                            self.name, doc.id, message
                        );
                    }
                    found.push(doc);
                }
                None => missing.push(id.to_string()),
            }
        }
        if !missing.is_empty() {
            if options.ignore_missing_ids {
                warn!(
                    "[COLLECTION] ignoring {} missing ids in '{}': {:?}",
                    missing.len(),
                    self.name,
                    missing
                );
            } else {
                return Err(DocLinkError::MissingDocuments {
                    collection: self.name.clone(),
                    ids: missing,
                });
            }
        }
        self.inner.stats.record_fetched(found.len() as u64);
        Ok(found)
    }

    /// Run one page of a query.
    pub async fn query(&self, desc: &QueryDescription) -> Result<QueryPage> {
        let page = query::run(self.inner.store.as_ref(), &self.name, desc).await?;
        self.inner.stats.record_fetched(page.items.len() as u64);
        Ok(page)
    }

    // ── writes ──────────────────────────────────────────────────────────────

    /// Add a full document. The id is taken from the payload's `id` field or
    /// drawn from the generator, and is embedded back into the stored
    /// payload either way. Validation is fatal here.
    pub async fn add(&self, item: Value, options: WriteOptions) -> Result<WriteTask> {
        let Value::Object(mut data) = item else {
            return Err(DocLinkError::InvalidTask(format!(
                "add to '{}' requires an object payload",
                self.name
            )));
        };
        let id = match data.get("id").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ if self.inner.auto_generate_ids => self.generate_id(),
            _ => {
                return Err(DocLinkError::InvalidTask(format!(
                    "add to '{}' has no id and id generation is disabled",
                    self.name
                )));
            }
        };
        data.insert("id".to_string(), Value::String(id.clone()));
        let task = WriteTask::add(&self.name, id, Value::Object(data))?;
        self.finish(task, options).await
    }

    /// Merge a partial payload into an existing document. An empty payload is
    /// a no-op and yields an empty task.
    pub async fn update(
        &self,
        id: &str,
        fields: FieldValue,
        options: WriteOptions,
    ) -> Result<WriteTask> {
        if fields.is_empty_map() {
            warn!(
                "[COLLECTION] empty update for '{}/{}' is a no-op",
                self.name, id
            );
            return Ok(WriteTask::empty(&self.name));
        }
        let task = WriteTask::update(&self.name, id, fields)?;
        self.finish(task, options).await
    }

    /// Destructively replace the single field addressed by a path-shape
    /// object with the sub-value extracted from `value_object` at the same
    /// path. Shape problems fail here, before anything is enqueued.
    pub async fn set_path(
        &self,
        id: &str,
        path_shape: Value,
        value_object: FieldValue,
        options: WriteOptions,
    ) -> Result<WriteTask> {
        path::resolve_path(&path_shape)?;
        let task = WriteTask::set_path(&self.name, id, path_shape, value_object)?;
        self.finish(task, options).await
    }

    /// Remove a document.
    pub async fn delete(&self, id: &str, options: WriteOptions) -> Result<WriteTask> {
        let task = WriteTask::delete(&self.name, id)?;
        self.finish(task, options).await
    }

    async fn finish(&self, task: WriteTask, options: WriteOptions) -> Result<WriteTask> {
        if !options.return_task_only {
            self.inner.commit_tasks(std::slice::from_ref(&task)).await?;
        }
        Ok(task)
    }

    // ── subscriptions ───────────────────────────────────────────────────────

    /// Build a live view over a query. Subscriptions to equivalent
    /// descriptions share one backend listener.
    pub async fn query_subscribe(&self, desc: &QueryDescription) -> Result<LiveQuery> {
        let fingerprint = fingerprint::query_fingerprint(&self.name, desc)?;
        let compiled = query::compile(self.inner.store.as_ref(), &self.name, desc).await?;
        Ok(LiveQuery {
            registry: Arc::clone(&self.inner.registry),
            store: Arc::clone(&self.inner.store),
            fingerprint,
            query: compiled,
        })
    }

    /// Build a live view over a single document.
    pub fn doc_subscribe(&self, id: &str) -> Result<LiveDocument> {
        if id.trim().is_empty() {
            return Err(DocLinkError::InvalidTask(format!(
                "subscription in '{}' requires a document id",
                self.name
            )));
        }
        Ok(LiveDocument {
            registry: Arc::clone(&self.inner.registry),
            store: Arc::clone(&self.inner.store),
            fingerprint: fingerprint::doc_fingerprint(&self.name, id),
            collection: self.name.clone(),
            id: id.to_string(),
        })
    }
}
