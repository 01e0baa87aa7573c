use std::sync::LazyLock;

use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::ServiceError;

/// Claims of an access token issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

static DECODING_KEY: LazyLock<DecodingKey> = LazyLock::new(|| {
    let secret = read_or_generate_secret();
    DecodingKey::from_secret(&secret)
});

fn read_or_generate_secret() -> Vec<u8> {
    if let Ok(secret) = std::env::var("ARENA_JWT_SECRET") {
        secret.as_bytes().to_vec()
    } else {
        log::warn!("JWT secret not found, generating a random one...");
        Uuid::new_v4().as_bytes().to_vec()
    }
}

pub fn validate_access_token(token: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(token, &DECODING_KEY, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ServiceError::Unauthorized("Missing bearer token".to_string()))?;
        validate_access_token(bearer.token())
    }
}
