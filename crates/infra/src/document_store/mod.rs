//! Document storage: the backing-store contract and its adapters.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

use std::sync::Arc;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use r#trait::{Document, DocumentStore, DocumentStoreError, Fields};

use crate::config::{InfraConfig, StoreBackend};

/// Build the configured backing store.
///
/// Postgres stores are migrated before being handed out.
pub async fn connect(config: &InfraConfig) -> Result<Arc<dyn DocumentStore>, DocumentStoreError> {
    match &config.backend {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory document store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        StoreBackend::Postgres { database_url } => {
            tracing::info!("using postgres document store");
            let store = PostgresDocumentStore::connect(database_url, &config.store).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}
