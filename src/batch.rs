//! Batch compilation: task descriptors to backend write operations.
//!
//! Runs once, at commit time. Empty tasks are dropped, schema validation
//! gates full-document writes, and sentinel substitution lowers update and
//! set-path payloads to backend directives. Any error aborts the whole batch
//! before a single operation reaches the store.

use crate::error::{DocLinkError, Result};
use crate::models::{TaskKind, WriteTask};
use crate::path;
use crate::sentinel;
use crate::store::{WriteBatch, WriteOp};
use crate::validate::{SchemaValidator, ValidationOutcome};
use log::debug;

/// Compile a list of tasks into one atomic write batch.
pub fn compile_batch(tasks: &[WriteTask], validator: &dyn SchemaValidator) -> Result<WriteBatch> {
    let mut batch = WriteBatch::new();
    for task in tasks {
        if task.is_empty() {
            continue;
        }
        task.ensure_idents()?;
        match &task.kind {
            TaskKind::Add { id, data } => {
                if let ValidationOutcome::Fail(message) = validator.validate(&task.collection, data)
                {
                    return Err(DocLinkError::ValidationFailed {
                        collection: task.collection.clone(),
                        message,
                    });
                }
                batch.push(WriteOp::Set {
                    collection: task.collection.clone(),
                    id: id.clone(),
                    data: data.clone(),
                });
            }
            TaskKind::Update { id, fields } => {
                if fields.is_empty_map() {
                    continue;
                }
                batch.push(WriteOp::Merge {
                    collection: task.collection.clone(),
                    id: id.clone(),
                    fields: sentinel::substitute(fields),
                });
            }
            TaskKind::SetPath {
                id,
                path_shape,
                value_object,
            } => {
                let field_path = path::resolve_path(path_shape)?;
                let replacement = path::extract_field_value(path_shape, value_object)?;
                batch.push(WriteOp::SetField {
                    collection: task.collection.clone(),
                    id: id.clone(),
                    path: field_path,
                    value: sentinel::substitute(&replacement),
                });
            }
            TaskKind::Delete { id } => {
                batch.push(WriteOp::Delete {
                    collection: task.collection.clone(),
                    id: id.clone(),
                });
            }
            TaskKind::Empty => {}
        }
    }
    debug!(
        "[BATCH] compiled {} tasks into {} ops",
        tasks.len(),
        batch.len()
    );
    Ok(batch)
}
