//! Error types for doclink.
//!
//! One enum covers the whole taxonomy: construction errors (malformed tasks,
//! filters, path shapes), write-blocking validation failures, aggregate
//! missing-document errors on bulk reads, and backend/transport errors
//! surfaced by the store collaborator.

use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, DocLinkError>;

/// Errors that can occur in doclink operations
#[derive(Error, Debug, Clone)]
pub enum DocLinkError {
    /// Client was misconfigured (e.g. no store supplied to the builder)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Malformed mutation task (blank id or collection)
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// Malformed filter clause (unknown operator, bad shape)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Malformed path-shape object (empty or ambiguous level)
    #[error("Invalid path shape: {0}")]
    InvalidPathShape(String),

    /// Schema validation rejected a document on the write path
    #[error("Validation failed for collection '{collection}': {message}")]
    ValidationFailed { collection: String, message: String },

    /// Bulk get could not find one or more requested ids
    #[error("Missing documents in collection '{collection}': {ids:?}")]
    MissingDocuments { collection: String, ids: Vec<String> },

    /// Query could not be compiled or executed
    #[error("Query error: {0}")]
    QueryError(String),

    /// Error surfaced by the backend document store
    #[error("Store error: {0}")]
    StoreError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (poisoned lock, broken invariant)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for DocLinkError {
    fn from(err: serde_json::Error) -> Self {
        DocLinkError::SerializationError(err.to_string())
    }
}
