//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the inventory service plus the last-known list
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use pantry_infra::{DocumentStoreError, InfraConfig};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router around already-wired services.
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router().layer(Extension(services)))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
}

/// Connect the configured backing store and build the router (used by `main.rs`).
pub async fn build_app_from_config(config: &InfraConfig) -> Result<Router, DocumentStoreError> {
    let services = AppServices::from_config(config).await?;
    Ok(build_app(Arc::new(services)))
}
