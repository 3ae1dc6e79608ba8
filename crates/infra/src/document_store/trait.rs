use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use pantry_core::ExpectedRevision;

/// Field map of a document (full overwrite on `put`).
pub type Fields = serde_json::Map<String, JsonValue>;

/// A stored document.
///
/// `revision` starts at 1 when the document is created and grows by one per
/// successful write. It is what conditional writes compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub key: String,
    pub fields: Fields,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

/// Backing-store operation error.
///
/// - **Unavailable**: the store could not be reached or did not answer in time
/// - **Conflict**: a conditional write saw a different revision; nothing was written
/// - **InvalidDocument**: the store returned a row that is not a valid document
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("invalid document {key:?}: {reason}")]
    InvalidDocument { key: String, reason: String },
}

/// Document-oriented key/value store with one namespace per collection.
///
/// ## Write semantics
///
/// `put` and `delete` take an [`ExpectedRevision`]. A write applies atomically
/// only when the stored revision matches; otherwise it fails with
/// [`DocumentStoreError::Conflict`] and leaves the record untouched. Read-modify-write
/// callers pass the revision they read, which turns a lost update into a retry.
///
/// ## Listing
///
/// `list_all` returns a snapshot in whatever order the store iterates; callers must
/// not rely on it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, DocumentStoreError>;

    /// Upsert `fields` under `key`, replacing any previous fields.
    async fn put(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        expected: ExpectedRevision,
    ) -> Result<Document, DocumentStoreError>;

    /// Delete `key`. Deleting a missing record with `ExpectedRevision::Any` is a no-op.
    async fn delete(
        &self,
        collection: &str,
        key: &str,
        expected: ExpectedRevision,
    ) -> Result<(), DocumentStoreError>;

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, DocumentStoreError> {
        (**self).get(collection, key).await
    }

    async fn put(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        expected: ExpectedRevision,
    ) -> Result<Document, DocumentStoreError> {
        (**self).put(collection, key, fields, expected).await
    }

    async fn delete(
        &self,
        collection: &str,
        key: &str,
        expected: ExpectedRevision,
    ) -> Result<(), DocumentStoreError> {
        (**self).delete(collection, key, expected).await
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        (**self).list_all(collection).await
    }
}
