use std::sync::{Arc, RwLock};

use pantry_infra::{
    DocumentStore, DocumentStoreError, InfraConfig, InventoryError, InventoryStore, StoreConfig,
    document_store,
};
use pantry_inventory::{InventoryItem, ItemName, RemoveOutcome};

/// Inventory listing as served to clients.
///
/// `stale` is set when the backing store could not be reached and the last
/// successful listing was served instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryListing {
    pub items: Vec<InventoryItem>,
    pub stale: bool,
}

/// Services shared by all handlers.
///
/// The store stays the only authority. `last_listing` is a disposable copy of the
/// most recent successful `list()`: replaced wholesale after every successful
/// listing or mutation, never edited in place, and only read when the store is
/// unavailable.
pub struct AppServices {
    inventory: InventoryStore<Arc<dyn DocumentStore>>,
    last_listing: RwLock<Option<Vec<InventoryItem>>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>, config: StoreConfig) -> Self {
        Self {
            inventory: InventoryStore::new(store, config),
            last_listing: RwLock::new(None),
        }
    }

    pub async fn from_config(config: &InfraConfig) -> Result<Self, DocumentStoreError> {
        let store = document_store::connect(config).await?;
        Ok(Self::new(store, config.store.clone()))
    }

    pub async fn list_items(&self) -> Result<InventoryListing, InventoryError> {
        match self.inventory.list().await {
            Ok(items) => {
                self.remember(items.clone());
                Ok(InventoryListing { items, stale: false })
            }
            Err(InventoryError::StoreUnavailable(reason)) => match self.last_known() {
                Some(items) => {
                    tracing::warn!(%reason, "store unavailable, serving last known listing");
                    Ok(InventoryListing { items, stale: true })
                }
                None => Err(InventoryError::StoreUnavailable(reason)),
            },
            Err(e) => Err(e),
        }
    }

    pub async fn add_item(&self, name: &str) -> Result<InventoryItem, InventoryError> {
        let item = self.inventory.add(name).await?;
        self.refresh().await;
        Ok(item)
    }

    pub async fn remove_item(&self, name: &str) -> Result<(ItemName, RemoveOutcome), InventoryError> {
        let name = ItemName::parse(name)?;
        let outcome = self.inventory.remove(name.as_str()).await?;
        if outcome != RemoveOutcome::NotFound {
            self.refresh().await;
        }
        Ok((name, outcome))
    }

    pub async fn find_item(&self, term: &str) -> Result<Option<InventoryItem>, InventoryError> {
        self.inventory.find(term).await
    }

    /// Re-read the listing after a mutation. A failure keeps the previous copy.
    async fn refresh(&self) {
        match self.inventory.list().await {
            Ok(items) => self.remember(items),
            Err(e) => tracing::warn!(error = %e, "could not refresh listing after mutation"),
        }
    }

    fn remember(&self, items: Vec<InventoryItem>) {
        if let Ok(mut last) = self.last_listing.write() {
            *last = Some(items);
        }
    }

    fn last_known(&self) -> Option<Vec<InventoryItem>> {
        self.last_listing.read().ok().and_then(|last| last.clone())
    }
}
