use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::{Deserialize, Serialize};

use crate::{
    app::{AppState, ServiceError},
    auth::SignUpOutcome,
    identity::{AuthSession, AuthUser},
    jwt::validate_access_token,
    session::{Session, SessionContext},
};

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct GuestRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct OAuthResponse {
    pub url: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<SignUpOutcome>, ServiceError> {
    let ctx = SessionContext::new();
    let outcome = state
        .auth_service
        .sign_up(&ctx, &request.email, &request.password, &request.username)
        .await?;
    Ok(Json(outcome))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<AuthSession>, ServiceError> {
    let ctx = SessionContext::new();
    let session = state
        .auth_service
        .sign_in(&ctx, &request.email, &request.password)
        .await?;
    Ok(Json(session))
}

pub async fn sign_out(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // Rebuild the caller's session around the presented token so the
    // adapter can revoke it at the provider.
    let claims = validate_access_token(bearer.token())?;
    let ctx = SessionContext::resume(Session::Account(AuthSession {
        access_token: bearer.token().to_string(),
        refresh_token: None,
        expires_in: None,
        user: AuthUser {
            id: claims.sub,
            email: None,
        },
    }));
    state.auth_service.sign_out(&ctx).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn guest_sign_in(
    State(state): State<AppState>,
    Json(request): Json<GuestRequest>,
) -> Result<Json<Session>, ServiceError> {
    let ctx = SessionContext::new();
    let session = state.auth_service.guest_sign_in(&ctx, &request.username)?;
    Ok(Json(session))
}

pub async fn oauth_url(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Json<OAuthResponse> {
    Json(OAuthResponse {
        url: state.auth_service.oauth_url(&provider),
    })
}
