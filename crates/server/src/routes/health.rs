use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::{Metrics, ServerState};

/// Server start time for uptime reporting.
fn server_start() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

/// Health check endpoint (liveness).
/// Returns 200 with the serving snapshot's shape while the server runs.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();

    Json(json!({
        "status": "ok",
        "service": "simdex",
        "uptime_seconds": server_start().elapsed().as_secs(),
        "signatures": snapshot.signatures,
        "store": snapshot.store.is_some(),
        "vptree": snapshot.vptree.is_some(),
    }))
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(&state.metrics),
    )
}

fn render_metrics(metrics: &Metrics) -> String {
    let requests = metrics.requests.load(Ordering::Relaxed);
    let signatures = metrics.signatures.load(Ordering::Relaxed);
    let reloads = metrics.reloads.load(Ordering::Relaxed);

    format!(
        "# HELP simdex_requests_total Queries served since startup.\n\
         # TYPE simdex_requests_total counter\n\
         simdex_requests_total {requests}\n\
         # HELP simdex_signatures Signatures in the serving snapshot.\n\
         # TYPE simdex_signatures gauge\n\
         simdex_signatures {signatures}\n\
         # HELP simdex_reloads_total Successful snapshot reloads.\n\
         # TYPE simdex_reloads_total counter\n\
         simdex_reloads_total {reloads}\n"
    )
}
