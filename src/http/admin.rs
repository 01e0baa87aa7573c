use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;

#[derive(Deserialize)]
pub struct AdminCreateUserRequest {
    email: Option<String>,
    password: Option<String>,
    username: Option<String>,
}

/// Admin-only user creation. Requires the `x-admin-key` header to match the
/// configured secret; the fields are checked by hand so a missing one yields
/// the documented 400 instead of a deserialization rejection.
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AdminCreateUserRequest>,
) -> impl IntoResponse {
    let admin_key = headers.get("x-admin-key").and_then(|v| v.to_str().ok());
    if admin_key != Some(state.admin_key.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Unauthorized - Invalid admin key" })),
        );
    }

    let (Some(email), Some(password), Some(username)) =
        (body.email, body.password, body.username)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "email, password and username are required" })),
        );
    };

    match state
        .auth_service
        .admin_create_user(&email, &password, &username)
        .await
    {
        Ok(created) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": created })),
        ),
        Err(err) => (
            err.status_code(),
            Json(json!({ "success": false, "error": err.message() })),
        ),
    }
}
