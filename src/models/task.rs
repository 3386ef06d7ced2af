//! Mutation task descriptors.
//!
//! A [`WriteTask`] is a serializable description of one pending mutation,
//! deferred from execution so that several mutations can be committed
//! atomically together. Every non-empty task carries a non-blank id and
//! collection name; violating that is a fatal construction error, never a
//! silent drop.

use crate::error::{DocLinkError, Result};
use crate::models::FieldValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminated mutation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Full-document write; last-writer-wins at the backend
    Add { id: String, data: Value },
    /// Partial payload merged field-by-field into the existing document
    Update { id: String, fields: FieldValue },
    /// Destructive write of a single field addressed by a path-shape object;
    /// the replacement sub-value is extracted from `value_object` at the same
    /// path
    SetPath {
        id: String,
        path_shape: Value,
        value_object: FieldValue,
    },
    /// Remove the whole document
    Delete { id: String },
    /// No-op placeholder so every mutating operation has a uniform return
    /// type even when batching is deferred
    Empty,
}

/// One pending mutation against a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteTask {
    pub collection: String,
    pub kind: TaskKind,
}

impl WriteTask {
    pub fn add(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Result<Self> {
        let (collection, id) = require_idents(collection.into(), id.into())?;
        Ok(Self {
            collection,
            kind: TaskKind::Add { id, data },
        })
    }

    pub fn update(
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: FieldValue,
    ) -> Result<Self> {
        let (collection, id) = require_idents(collection.into(), id.into())?;
        Ok(Self {
            collection,
            kind: TaskKind::Update { id, fields },
        })
    }

    pub fn set_path(
        collection: impl Into<String>,
        id: impl Into<String>,
        path_shape: Value,
        value_object: FieldValue,
    ) -> Result<Self> {
        let (collection, id) = require_idents(collection.into(), id.into())?;
        Ok(Self {
            collection,
            kind: TaskKind::SetPath {
                id,
                path_shape,
                value_object,
            },
        })
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let (collection, id) = require_idents(collection.into(), id.into())?;
        Ok(Self {
            collection,
            kind: TaskKind::Delete { id },
        })
    }

    pub fn empty(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            kind: TaskKind::Empty,
        }
    }

    /// Target document id; `None` for empty tasks.
    pub fn id(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Add { id, .. }
            | TaskKind::Update { id, .. }
            | TaskKind::SetPath { id, .. }
            | TaskKind::Delete { id } => Some(id),
            TaskKind::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, TaskKind::Empty)
    }

    /// Re-check the id/collection invariant; used by the batch compiler
    /// before anything is enqueued.
    pub(crate) fn ensure_idents(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(DocLinkError::InvalidTask(
                "task is missing a collection name".to_string(),
            ));
        }
        match self.id() {
            Some(id) if id.trim().is_empty() => Err(DocLinkError::InvalidTask(format!(
                "task for collection '{}' has a blank id",
                self.collection
            ))),
            _ => Ok(()),
        }
    }
}

fn require_idents(collection: String, id: String) -> Result<(String, String)> {
    if collection.trim().is_empty() {
        return Err(DocLinkError::InvalidTask(
            "task is missing a collection name".to_string(),
        ));
    }
    if id.trim().is_empty() {
        return Err(DocLinkError::InvalidTask(format!(
            "task for collection '{}' has a blank id",
            collection
        )));
    }
    Ok((collection, id))
}
