use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use simdex::Storage;

use crate::error::{ServerError, ServerResult};
use crate::routes::parse_sig;
use crate::state::ServerState;

/// Query parameters for `/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Query fingerprint as a hex string.
    pub sig: String,
}

/// All docids whose stored fingerprint lies within Hamming distance 3 of
/// the query, as a JSON array in unspecified order.
pub async fn search(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SearchQuery>,
) -> ServerResult<Json<Vec<u64>>> {
    state.metrics.record_request();

    let sig = parse_sig(&query.sig)?;
    let snapshot = state.snapshot();
    let store = snapshot.store.as_ref().ok_or(ServerError::StoreDisabled)?;

    Ok(Json(store.find(sig)))
}
