use axum::{
    Router,
    routing::{get, post},
};
use log::info;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{app::AppState, data::Page};

mod admin;
mod auth;
mod external_db;
mod site;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    items: Vec<T>,
    total: usize,
    page: usize,
    per_page: usize,
    total_pages: usize,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.items,
            total: page.total_count,
            page: page.page,
            per_page: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

pub async fn run(state: AppState, shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static) {
    let router = Router::new()
        .route("/functions/external-db", post(external_db::handle))
        .route("/functions/create-user-admin", post(admin::create_user))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/guest", post(auth::guest_sign_in))
        .route("/auth/oauth/{provider}", get(auth::oauth_url))
        .nest(
            "/v1",
            Router::new()
                .route("/tiers", get(site::get_tiers))
                .route("/players", get(site::get_players))
                .route("/players/top", get(site::get_top_players))
                .route("/players/{name}", get(site::get_player_by_name))
                .route("/match-history/{player_id}", get(site::get_match_history))
                .route("/weapon-stats/{player_id}", get(site::get_weapon_stats))
                .route("/news", get(site::get_news))
                .route("/news/{id}", get(site::get_news_by_id))
                .route("/assets", get(site::get_assets))
                .route("/assets/{id}", get(site::get_asset_by_id))
                .route(
                    "/profiles/{user_id}",
                    get(site::get_profile).patch(site::update_profile),
                ),
        )
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("ARENA_HTTP_PORT")
        .expect("ARENA_HTTP_PORT must be set")
        .parse::<u16>()
        .expect("ARENA_HTTP_PORT must be a valid u16");

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .unwrap();

    info!("API server listening on port {}", port);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .unwrap();

    info!("HTTP API shut down gracefully");
}
