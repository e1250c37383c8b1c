use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

/// Rebuild the snapshot from the configured input file and swap it in.
/// The build runs on a blocking task; a failure leaves the current
/// snapshot serving and reports the error.
pub async fn reload(State(state): State<Arc<ServerState>>) -> ServerResult<Json<Value>> {
    state.metrics.record_request();
    tracing::info!("reloading...");

    let worker = state.clone();
    let signatures = tokio::task::spawn_blocking(move || worker.reload())
        .await
        .map_err(|err| ServerError::Internal(format!("reload task failed: {err}")))?
        .inspect_err(|err| tracing::error!(%err, "reload failed: keeping current snapshot"))?;

    tracing::info!(signatures, "reload complete");
    Ok(Json(json!({
        "status": "reloaded",
        "signatures": signatures,
    })))
}
