//! HTTP and websocket surface of the recognition server.

mod api;
pub mod ws;

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::AppState;

/// Origins of the desktop shell and its dev server.
const ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "tauri://localhost",
    "http://tauri.localhost",
    "https://tauri.localhost",
];

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            ALLOWED_ORIGINS.into_iter().map(HeaderValue::from_static),
        ))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/teach", post(api::teach))
        .route("/api/settings", get(api::get_settings).post(api::update_settings))
        .route("/api/status", get(api::status))
        .route("/api/labels", get(api::labels))
        .route("/api/symbols/categorized", get(api::categorized_symbols))
        .route("/api/drawings", get(api::list_drawings))
        .route(
            "/api/drawings/:id",
            get(api::get_drawing).delete(api::delete_drawing),
        )
        .route("/api/data/reset", delete(api::reset_data))
        .route("/ws/record", get(ws::record_socket))
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("listener has no local address")?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server terminated with an error")?;

    info!("Server stopped");
    Ok(())
}
