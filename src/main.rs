use std::sync::Arc;

use log::info;

use crate::{
    app::{ArcExternalStore, ArcIdentityProvider},
    identity::RestIdentityProvider,
    store::rest::RestExternalStore,
};

mod app;
mod auth;
mod data;
mod http;
mod identity;
mod jwt;
mod logs;
mod proxy;
mod session;
mod store;
mod tier;
mod validation;

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().expect("Failed to load .env file");

    logs::init_logger();

    let store: ArcExternalStore = Arc::new(RestExternalStore::new());
    let identity: ArcIdentityProvider = Arc::new(RestIdentityProvider::new());
    let state = app::construct_app(store, identity);

    info!("Starting application");

    http::run(state, shutdown_signal()).await;
}
