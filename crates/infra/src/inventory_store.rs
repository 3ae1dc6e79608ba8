//! Inventory service: the five pantry operations over a [`DocumentStore`].
//!
//! Each mutation is a read → [`decide`] → conditional write loop. The write
//! carries the revision that was read, so a concurrent writer turns into a
//! conflict and a re-read instead of a silently lost update.

use std::future::Future;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use pantry_core::{DomainError, ExpectedRevision};
use pantry_inventory::{
    InventoryItem, ItemName, Quantity, RemoveOutcome, StockChange, StockCommand, decide,
};

use crate::config::StoreConfig;
use crate::document_store::{Document, DocumentStore, DocumentStoreError, Fields};

const QUANTITY_FIELD: &str = "quantity";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("invalid item name: {0}")]
    InvalidName(String),

    #[error("search term cannot be empty")]
    EmptySearchTerm,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("too much contention: {0}")]
    Contention(String),

    #[error("malformed record {key:?}: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl From<DomainError> for InventoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidName(msg) => InventoryError::InvalidName(msg),
            DomainError::EmptySearchTerm => InventoryError::EmptySearchTerm,
            DomainError::InvariantViolation(msg) => InventoryError::Invariant(msg),
            DomainError::Conflict(msg) => InventoryError::Contention(msg),
        }
    }
}

impl From<DocumentStoreError> for InventoryError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::Unavailable(msg) => InventoryError::StoreUnavailable(msg),
            DocumentStoreError::Conflict(msg) => InventoryError::Contention(msg),
            DocumentStoreError::InvalidDocument { key, reason } => {
                InventoryError::MalformedRecord { key, reason }
            }
        }
    }
}

/// Stored shape of one record. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct PantryRecord {
    quantity: Quantity,
}

fn encode(quantity: Quantity) -> Fields {
    let mut fields = Fields::new();
    fields.insert(QUANTITY_FIELD.to_string(), JsonValue::from(quantity.get()));
    fields
}

fn decode_quantity(doc: &Document) -> Result<Quantity, InventoryError> {
    serde_json::from_value::<PantryRecord>(JsonValue::Object(doc.fields.clone()))
        .map(|r| r.quantity)
        .map_err(|e| InventoryError::MalformedRecord {
            key: doc.key.clone(),
            reason: e.to_string(),
        })
}

fn decode_item(doc: &Document) -> Result<InventoryItem, InventoryError> {
    let name = ItemName::parse(&doc.key).map_err(|e| InventoryError::MalformedRecord {
        key: doc.key.clone(),
        reason: e.to_string(),
    })?;
    // add/remove/find only ever address the normalized key, so anything else is unreachable.
    if name.as_str() != doc.key {
        return Err(InventoryError::MalformedRecord {
            key: doc.key.clone(),
            reason: format!("key is not normalized (expected {:?})", name.as_str()),
        });
    }
    Ok(InventoryItem::new(name, decode_quantity(doc)?))
}

/// Name → quantity inventory kept in one collection of a document store.
///
/// The store is the only source of truth; nothing is cached here.
#[derive(Debug)]
pub struct InventoryStore<S> {
    store: S,
    config: StoreConfig,
}

impl<S> InventoryStore<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, config: StoreConfig) -> Self {
        Self { store, config }
    }

    pub fn document_store(&self) -> &S {
        &self.store
    }

    /// Snapshot of every record, in store order.
    ///
    /// Records that do not decode are logged and skipped rather than failing the
    /// whole listing.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn list(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        let docs = self
            .call("list_all", self.store.list_all(&self.config.collection))
            .await?;

        let mut items = Vec::with_capacity(docs.len());
        for doc in &docs {
            match decode_item(doc) {
                Ok(item) => items.push(item),
                Err(e) => warn!(key = %doc.key, error = %e, "skipping malformed record"),
            }
        }
        debug!(count = items.len(), "listed inventory");
        Ok(items)
    }

    /// Create the record with quantity 1, or add one to it.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn add(&self, name: &str) -> Result<InventoryItem, InventoryError> {
        let name = ItemName::parse(name)?;
        let change = self.mutate(&name, StockCommand::Add).await?;
        let quantity = change
            .resulting_quantity()
            .ok_or_else(|| InventoryError::Invariant(format!("add produced {change:?}")))?;
        Ok(InventoryItem::new(name, quantity))
    }

    /// Take one away; the last unit deletes the record.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn remove(&self, name: &str) -> Result<RemoveOutcome, InventoryError> {
        let name = ItemName::parse(name)?;
        let change = self.mutate(&name, StockCommand::Remove).await?;
        change
            .remove_outcome()
            .ok_or_else(|| InventoryError::Invariant(format!("remove produced {change:?}")))
    }

    /// Exact lookup of the normalized name. `Ok(None)` when no record exists.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn find(&self, term: &str) -> Result<Option<InventoryItem>, InventoryError> {
        let name = ItemName::parse_search(term)?;
        let doc = self
            .call("get", self.store.get(&self.config.collection, name.as_str()))
            .await?;

        match doc {
            Some(doc) => Ok(Some(InventoryItem::new(name, decode_quantity(&doc)?))),
            None => Ok(None),
        }
    }

    async fn mutate(&self, name: &ItemName, command: StockCommand) -> Result<StockChange, InventoryError> {
        let collection = self.config.collection.as_str();
        let key = name.as_str();

        for attempt in 1..=self.config.max_attempts {
            let current = self.call("get", self.store.get(collection, key)).await?;
            let (revision, quantity) = match &current {
                Some(doc) => (Some(doc.revision), Some(decode_quantity(doc)?)),
                None => (None, None),
            };

            let change = decide(quantity, command)?;
            let expected = ExpectedRevision::from_current(revision);

            let written = match change {
                StockChange::Unchanged => return Ok(change),
                StockChange::Deleted => self
                    .call("delete", self.store.delete(collection, key, expected))
                    .await,
                StockChange::Created(q) | StockChange::Incremented(q) | StockChange::Decremented(q) => self
                    .call("put", self.store.put(collection, key, encode(q), expected))
                    .await
                    .map(|_| ()),
            };

            match written {
                Ok(()) => {
                    debug!(key, ?change, attempt, "record updated");
                    return Ok(change);
                }
                Err(DocumentStoreError::Conflict(reason)) => {
                    warn!(key, attempt, %reason, "concurrent write detected, retrying");
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(InventoryError::Contention(format!(
            "{key}: gave up after {} attempts",
            self.config.max_attempts
        )))
    }

    /// Run one backing-store call under the configured timeout.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DocumentStoreError>
    where
        F: Future<Output = Result<T, DocumentStoreError>>,
    {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.config.timeout, "backing store call timed out");
                Err(DocumentStoreError::Unavailable(format!(
                    "{operation} timed out after {:?}",
                    self.config.timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::document_store::InMemoryDocumentStore;

    fn service() -> InventoryStore<Arc<InMemoryDocumentStore>> {
        InventoryStore::new(Arc::new(InMemoryDocumentStore::new()), StoreConfig::default())
    }

    fn q(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    async fn snapshot<S: DocumentStore>(svc: &InventoryStore<S>) -> Vec<(String, u32)> {
        let mut items: Vec<_> = svc
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.name.into_string(), i.quantity.get()))
            .collect();
        items.sort();
        items
    }

    #[tokio::test]
    async fn add_creates_then_increments() {
        let svc = service();
        let first = svc.add("apple").await.unwrap();
        assert_eq!(first.name.as_str(), "Apple");
        assert_eq!(first.quantity, q(1));

        let second = svc.add("apple").await.unwrap();
        assert_eq!(second.quantity, q(2));
    }

    #[tokio::test]
    async fn records_store_only_the_quantity_field() {
        let svc = service();
        svc.add("rice").await.unwrap();
        let doc = svc.document_store().get("pantry", "Rice").await.unwrap().unwrap();
        assert_eq!(JsonValue::Object(doc.fields), json!({ "quantity": 1 }));
    }

    #[tokio::test]
    async fn remove_last_unit_deletes_record() {
        let svc = service();
        svc.add("milk").await.unwrap();

        assert_eq!(svc.remove("milk").await.unwrap(), RemoveOutcome::Deleted);
        assert!(snapshot(&svc).await.is_empty());
        assert!(svc.document_store().get("pantry", "Milk").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_decrements_above_one() {
        let svc = service();
        svc.add("oats").await.unwrap();
        svc.add("oats").await.unwrap();
        svc.add("oats").await.unwrap();

        assert_eq!(svc.remove("oats").await.unwrap(), RemoveOutcome::Decremented(q(2)));
        assert_eq!(snapshot(&svc).await, vec![("Oats".to_string(), 2)]);
    }

    #[tokio::test]
    async fn remove_missing_is_not_found_and_changes_nothing() {
        let svc = service();
        svc.add("tea").await.unwrap();

        assert_eq!(svc.remove("ghost").await.unwrap(), RemoveOutcome::NotFound);
        assert_eq!(snapshot(&svc).await, vec![("Tea".to_string(), 1)]);
    }

    #[tokio::test]
    async fn find_is_exact_after_normalization() {
        let svc = service();
        svc.add("Banana").await.unwrap();

        let found = svc.find("banana").await.unwrap().unwrap();
        assert_eq!(found.name.as_str(), "Banana");
        assert_eq!(found.quantity, q(1));

        assert!(svc.find("Bananas").await.unwrap().is_none());
        assert!(svc.find("nana").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_search_term_is_rejected() {
        let svc = service();
        assert_eq!(svc.find("   ").await.unwrap_err(), InventoryError::EmptySearchTerm);
    }

    #[tokio::test]
    async fn blank_names_are_rejected_before_any_io() {
        let svc = service();
        svc.document_store().set_available(false);

        assert!(matches!(svc.add("").await, Err(InventoryError::InvalidName(_))));
        assert!(matches!(svc.remove("  ").await, Err(InventoryError::InvalidName(_))));
        assert_eq!(svc.find("").await.unwrap_err(), InventoryError::EmptySearchTerm);
    }

    #[tokio::test]
    async fn add_then_remove_restores_prior_state() {
        let svc = service();
        svc.add("flour").await.unwrap();
        let before = snapshot(&svc).await;

        for _ in 0..5 {
            svc.add("sugar").await.unwrap();
            svc.add("flour").await.unwrap();
        }
        for _ in 0..5 {
            svc.remove("sugar").await.unwrap();
            svc.remove("flour").await.unwrap();
        }

        assert_eq!(snapshot(&svc).await, before);
    }

    #[tokio::test]
    async fn egg_lifecycle() {
        let svc = service();
        svc.add("egg").await.unwrap();
        svc.add("egg").await.unwrap();
        assert_eq!(snapshot(&svc).await, vec![("Egg".to_string(), 2)]);

        assert_eq!(svc.remove("egg").await.unwrap(), RemoveOutcome::Decremented(q(1)));
        assert_eq!(snapshot(&svc).await, vec![("Egg".to_string(), 1)]);

        assert_eq!(svc.remove("egg").await.unwrap(), RemoveOutcome::Deleted);
        assert!(snapshot(&svc).await.is_empty());

        assert_eq!(svc.remove("egg").await.unwrap(), RemoveOutcome::NotFound);
        assert!(snapshot(&svc).await.is_empty());
    }

    #[tokio::test]
    async fn offline_store_surfaces_store_unavailable() {
        let svc = service();
        svc.add("salt").await.unwrap();
        svc.document_store().set_available(false);

        assert!(matches!(svc.list().await, Err(InventoryError::StoreUnavailable(_))));
        assert!(matches!(svc.add("salt").await, Err(InventoryError::StoreUnavailable(_))));
        assert!(matches!(svc.remove("salt").await, Err(InventoryError::StoreUnavailable(_))));
        assert!(matches!(svc.find("salt").await, Err(InventoryError::StoreUnavailable(_))));

        svc.document_store().set_available(true);
        assert_eq!(snapshot(&svc).await, vec![("Salt".to_string(), 1)]);
    }

    #[tokio::test]
    async fn slow_store_times_out_without_writing() {
        let store = Arc::new(InMemoryDocumentStore::new().with_latency(Duration::from_millis(200)));
        let config = StoreConfig {
            timeout: Duration::from_millis(20),
            ..StoreConfig::default()
        };
        let svc = InventoryStore::new(store.clone(), config);

        assert!(matches!(svc.add("pepper").await, Err(InventoryError::StoreUnavailable(_))));
        assert!(store.get("pantry", "Pepper").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_records_are_reported_and_skipped_in_list() {
        let svc = service();
        svc.add("honey").await.unwrap();

        let mut bad = Fields::new();
        bad.insert("quantity".to_string(), json!(0));
        svc.document_store()
            .put("pantry", "Jam", bad, ExpectedRevision::Any)
            .await
            .unwrap();

        assert!(matches!(
            svc.find("jam").await,
            Err(InventoryError::MalformedRecord { .. })
        ));
        assert!(matches!(
            svc.add("jam").await,
            Err(InventoryError::MalformedRecord { .. })
        ));
        assert_eq!(snapshot(&svc).await, vec![("Honey".to_string(), 1)]);
    }

    #[tokio::test]
    async fn non_normalized_keys_are_skipped_in_list() {
        let svc = service();
        let mut fields = Fields::new();
        fields.insert("quantity".to_string(), json!(3));
        svc.document_store()
            .put("pantry", "cheese", fields, ExpectedRevision::Any)
            .await
            .unwrap();

        svc.add("cheese").await.unwrap();
        assert_eq!(snapshot(&svc).await, vec![("Cheese".to_string(), 1)]);

        assert_eq!(svc.remove("cheese").await.unwrap(), RemoveOutcome::Deleted);
        assert!(snapshot(&svc).await.is_empty());
        assert_eq!(svc.remove("cheese").await.unwrap(), RemoveOutcome::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_do_not_lose_updates() {
        let store = Arc::new(InMemoryDocumentStore::new().with_latency(Duration::from_millis(1)));
        let svc = Arc::new(InventoryStore::new(store, StoreConfig::default()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.add("bread").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(svc.find("bread").await.unwrap().unwrap().quantity, q(16));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.remove("bread").await })
            })
            .collect();
        let mut deleted = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() == RemoveOutcome::Deleted {
                deleted += 1;
            }
        }

        assert_eq!(deleted, 1);
        assert!(svc.find("bread").await.unwrap().is_none());
    }

    /// Store whose conditional writes always lose the race.
    struct AlwaysConflicting {
        inner: InMemoryDocumentStore,
        writes: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for AlwaysConflicting {
        async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, DocumentStoreError> {
            self.inner.get(collection, key).await
        }

        async fn put(
            &self,
            _collection: &str,
            key: &str,
            _fields: Fields,
            _expected: ExpectedRevision,
        ) -> Result<Document, DocumentStoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(DocumentStoreError::Conflict(key.to_string()))
        }

        async fn delete(
            &self,
            _collection: &str,
            key: &str,
            _expected: ExpectedRevision,
        ) -> Result<(), DocumentStoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(DocumentStoreError::Conflict(key.to_string()))
        }

        async fn list_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
            self.inner.list_all(collection).await
        }
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let store = AlwaysConflicting {
            inner: InMemoryDocumentStore::new(),
            writes: AtomicU32::new(0),
        };
        let config = StoreConfig {
            max_attempts: 3,
            ..StoreConfig::default()
        };
        let svc = InventoryStore::new(store, config);

        assert!(matches!(svc.add("yeast").await, Err(InventoryError::Contention(_))));
        assert_eq!(svc.document_store().writes.load(Ordering::SeqCst), 3);
    }
}
