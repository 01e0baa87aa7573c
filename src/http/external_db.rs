use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{app::AppState, proxy::DbRequest};

/// Generic database pass-through. Always answers in the
/// `{success, data|error}` envelope; failures keep the status the error
/// maps to (400 for store and request-shape errors).
pub async fn handle(
    State(state): State<AppState>,
    Json(request): Json<DbRequest>,
) -> impl IntoResponse {
    match state.external_db.call(request).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": rows })),
        ),
        Err(err) => (
            err.status_code(),
            Json(json!({ "success": false, "error": err.message() })),
        ),
    }
}
