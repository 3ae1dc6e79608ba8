//! Infrastructure layer: document storage adapters, the inventory service, config.

pub mod config;
pub mod document_store;
pub mod inventory_store;

pub use config::{ConfigError, InfraConfig, StoreBackend, StoreConfig};
pub use document_store::{Document, DocumentStore, DocumentStoreError, Fields};
pub use inventory_store::{InventoryError, InventoryStore};
