//! # Web Interface
//!
//! axum front end for counter staff: register garments, print their tags,
//! and scan tags back with a camera.
//!
//! ## Architecture
//!
//! 1. **AppState** (`state`): inventory, generator, flash queue, scan slot
//! 2. **Handlers** (`routes`): one function per route
//! 3. **Pages** (`pages`): HTML templates
//!
//! Generated images are served from the static directory by `tower-http`.

pub mod pages;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use state::{AppState, Flash, FlashKind, ScanPoll};

pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(state.config.server.static_dir.clone());

    Router::new()
        .route("/", get(routes::index))
        .route("/ler_qr", get(routes::scan_page))
        .route("/processar_qr_camera", post(routes::start_scan))
        .route("/video_feed", get(routes::video_feed))
        .route("/scan_result", get(routes::scan_result))
        .route("/cancelar_qr", post(routes::cancel_scan))
        .route("/gerar_qr", get(routes::generate_form).post(routes::generate_tag))
        .route("/estoque", get(routes::inventory))
        .route("/health", get(routes::health))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, static_dir = %state.config.server.static_dir.display(), "web interface listening");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("http server failed")?;

    tracing::info!("web interface stopped");
    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    // Ends the preview stream so open viewers do not hold shutdown.
    state.cancel_scan().await;
}
