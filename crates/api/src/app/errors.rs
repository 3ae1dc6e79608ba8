use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pantry_infra::InventoryError;

pub fn inventory_error_to_response(err: InventoryError) -> axum::response::Response {
    match err {
        InventoryError::InvalidName(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_name", msg),
        InventoryError::EmptySearchTerm => json_error(
            StatusCode::BAD_REQUEST,
            "empty_search_term",
            "search term cannot be empty",
        ),
        InventoryError::StoreUnavailable(msg) => {
            tracing::warn!(%msg, "backing store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        InventoryError::Contention(msg) => json_error(StatusCode::CONFLICT, "contention", msg),
        e @ InventoryError::MalformedRecord { .. } => {
            tracing::error!(error = %e, "malformed record in backing store");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "malformed_record", e.to_string())
        }
        InventoryError::Invariant(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

/// Missing, mistyped or unparsable request bodies get the same JSON error shape
/// as every other failure.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(rejection.status(), "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
