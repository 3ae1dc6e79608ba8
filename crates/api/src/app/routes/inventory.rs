use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(add_item))
        .route("/items/remove", post(remove_item))
        .route("/search", get(find_item))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_items().await {
        Ok(listing) => (StatusCode::OK, Json(dto::ListResponse::from(listing))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::AddItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    match services.add_item(&body.name).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemResponse::from(item))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RemoveItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    match services.remove_item(&body.name).await {
        Ok((name, outcome)) => {
            (StatusCode::OK, Json(dto::RemoveResponse::new(name, outcome))).into_response()
        }
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn find_item(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SearchParams>,
) -> axum::response::Response {
    match services.find_item(&params.name).await {
        Ok(Some(item)) => (StatusCode::OK, Json(dto::ItemResponse::from(item))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
