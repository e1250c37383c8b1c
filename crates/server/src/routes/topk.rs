use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::routes::parse_sig;
use crate::state::ServerState;

fn default_k() -> usize {
    10
}

/// Query parameters for `/topk`.
#[derive(Debug, Deserialize)]
pub struct TopkQuery {
    /// Query fingerprint as a hex string.
    pub sig: String,

    /// Number of neighbors to return.
    #[serde(default = "default_k")]
    pub k: usize,
}

/// One nearest-neighbor hit.
#[derive(Debug, Serialize)]
pub struct Hit {
    pub id: u64,
    pub d: f64,
}

/// The `k` stored fingerprints nearest to the query, ascending by Hamming
/// distance.
pub async fn topk(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TopkQuery>,
) -> ServerResult<Json<Vec<Hit>>> {
    state.metrics.record_request();

    let sig = parse_sig(&query.sig)?;
    let snapshot = state.snapshot();
    let tree = snapshot.vptree.as_ref().ok_or(ServerError::VptreeDisabled)?;

    let hits = tree
        .search(sig, query.k)
        .into_iter()
        .map(|neighbor| Hit {
            id: neighbor.item.id,
            d: f64::from(neighbor.dist),
        })
        .collect();

    Ok(Json(hits))
}
