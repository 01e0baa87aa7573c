use std::sync::Arc;

use axum::response::IntoResponse;
use thiserror::Error;

use crate::{
    auth::AuthService,
    data::{
        assets::AssetService, news::NewsService, players::RankingService, profiles::ProfileService,
    },
    identity::IdentityProvider,
    proxy::ExternalDb,
    store::{ExternalStore, StoreError},
};

pub type ArcExternalStore = Arc<dyn ExternalStore + Send + Sync + 'static>;
pub type ArcIdentityProvider = Arc<dyn IdentityProvider + Send + Sync + 'static>;

#[derive(Clone)]
pub struct AppState {
    pub external_db: Arc<ExternalDb>,
    pub auth_service: Arc<AuthService>,
    pub ranking_service: Arc<RankingService>,
    pub news_service: Arc<NewsService>,
    pub asset_service: Arc<AssetService>,
    pub profile_service: Arc<ProfileService>,
    pub admin_key: Arc<String>,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("operation not possible: {0}")]
    NotPossible(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unexpected error: {0}")]
    Other(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn bad_request<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::BadRequest(msg.into()))
    }

    pub fn unauthorized<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Unauthorized(msg.into()))
    }

    pub fn not_found<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::NotFound(msg.into()))
    }

    pub fn not_possible<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::NotPossible(msg.into()))
    }

    pub fn forbidden<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Forbidden(msg.into()))
    }

    /// The human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            ServiceError::NotFound(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::BadRequest(msg)
            | ServiceError::NotPossible(msg)
            | ServiceError::Forbidden(msg)
            | ServiceError::Other(msg)
            | ServiceError::Internal(msg) => msg.clone(),
            ServiceError::Store(err) => err.to_string(),
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            ServiceError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => axum::http::StatusCode::UNAUTHORIZED,
            ServiceError::BadRequest(_)
            | ServiceError::Store(_)
            | ServiceError::NotPossible(_) => axum::http::StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => axum::http::StatusCode::FORBIDDEN,
            ServiceError::Other(_) | ServiceError::Internal(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::http::Response<axum::body::Body> {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.message() });
        (status, axum::Json(body)).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn construct_app(store: ArcExternalStore, identity: ArcIdentityProvider) -> AppState {
    let admin_key =
        std::env::var("ARENA_ADMIN_API_KEY").expect("ARENA_ADMIN_API_KEY env var not set");

    let external_db = Arc::new(ExternalDb::new(store));
    let auth_service = Arc::new(AuthService::new(identity, external_db.clone()));
    let ranking_service = Arc::new(RankingService::new(external_db.clone()));
    let news_service = Arc::new(NewsService::new(external_db.clone()));
    let asset_service = Arc::new(AssetService::new(external_db.clone()));
    let profile_service = Arc::new(ProfileService::new(external_db.clone()));

    AppState {
        external_db,
        auth_service,
        ranking_service,
        news_service,
        asset_service,
        profile_service,
        admin_key: Arc::new(admin_key),
    }
}
