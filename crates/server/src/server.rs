//! Server initialization and routing
//!
//! This module handles the axum server setup:
//! - Router configuration with all endpoints
//! - Middleware stack (tracing, compression)
//! - SIGHUP-triggered snapshot reloads
//! - Graceful shutdown handling

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::routes::{api_info, health, not_found, reload, search, topk};
use crate::state::ServerState;

/// Build the axum router with all routes and middleware.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/search", get(search::search))
        .route("/topk", get(topk::topk))
        .route("/reload", post(reload::reload))
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the simdex HTTP server.
///
/// Loads the initial snapshot from the configured input file (blocking
/// until it is ready), binds the listener, and serves until SIGTERM or
/// Ctrl+C. SIGHUP triggers a snapshot reload without interrupting
/// traffic.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level()))
        .with_target(false)
        .init();

    let addr = config.socket_addr()?;
    let service = config.service;

    tracing::info!(input = %service.ingest.input, "building initial snapshot");
    let state = Arc::new(ServerState::new(service)?);
    tracing::info!(
        signatures = state.metrics.signatures.load(std::sync::atomic::Ordering::Relaxed),
        "snapshot ready"
    );

    #[cfg(unix)]
    spawn_sighup_listener(state.clone());

    let app = build_router(state);

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Reload the snapshot on SIGHUP, the same path as POST /reload.
#[cfg(unix)]
fn spawn_sighup_listener(state: Arc<ServerState>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(%err, "failed to install SIGHUP handler");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            tracing::info!("caught SIGHUP, reloading");
            let worker = state.clone();
            match tokio::task::spawn_blocking(move || worker.reload()).await {
                Ok(Ok(signatures)) => tracing::info!(signatures, "reload complete"),
                Ok(Err(err)) => {
                    tracing::error!(%err, "reload failed: keeping current snapshot");
                }
                Err(err) => tracing::error!(%err, "reload task failed"),
            }
        }
    });
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("received SIGTERM, shutting down..."),
    }
}
