use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use pantry_core::ExpectedRevision;

use super::r#trait::{Document, DocumentStore, DocumentStoreError, Fields};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-memory document store.
///
/// Intended for tests/dev. Conditional writes are checked and applied under one
/// write lock, so they are atomic with respect to each other.
///
/// Two hooks simulate a remote store: `with_latency` delays every call (the
/// delay is awaited before touching any data, so a cancelled call writes
/// nothing) and `set_available(false)` makes every call fail as unavailable.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
    available: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<(), DocumentStoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, DocumentStoreError> {
        self.collections
            .read()
            .map_err(|_| DocumentStoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, DocumentStoreError> {
        self.collections
            .write()
            .map_err(|_| DocumentStoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check(
    collection: &str,
    key: &str,
    expected: ExpectedRevision,
    actual: Option<u64>,
) -> Result<(), DocumentStoreError> {
    expected
        .check(actual)
        .map_err(|e| DocumentStoreError::Conflict(format!("{collection}/{key}: {e}")))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, DocumentStoreError> {
        self.enter().await?;
        let collections = self.read()?;
        Ok(collections.get(collection).and_then(|docs| docs.get(key)).cloned())
    }

    async fn put(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        expected: ExpectedRevision,
    ) -> Result<Document, DocumentStoreError> {
        self.enter().await?;
        let mut collections = self.write()?;
        let docs = collections.entry(collection.to_string()).or_default();

        let current = docs.get(key).map(|d| d.revision);
        check(collection, key, expected, current)?;

        let doc = Document {
            key: key.to_string(),
            fields,
            revision: current.unwrap_or(0) + 1,
            updated_at: Utc::now(),
        };
        docs.insert(key.to_string(), doc.clone());
        Ok(doc)
    }

    async fn delete(
        &self,
        collection: &str,
        key: &str,
        expected: ExpectedRevision,
    ) -> Result<(), DocumentStoreError> {
        self.enter().await?;
        let mut collections = self.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return check(collection, key, expected, None);
        };

        let current = docs.get(key).map(|d| d.revision);
        check(collection, key, expected, current)?;
        docs.remove(key);
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        self.enter().await?;
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
