//! API route handlers
//!
//! - `health`: liveness probe and metrics counters
//! - `search`: radius-3 lookups against the store
//! - `topk`: nearest-neighbor lookups against the vp-tree
//! - `reload`: snapshot rebuild

pub mod health;
pub mod reload;
pub mod search;
pub mod topk;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Parse a hex fingerprint query parameter.
pub(crate) fn parse_sig(sig: &str) -> Result<u64, ServerError> {
    u64::from_str_radix(sig, 16)
        .map_err(|err| ServerError::BadRequest(format!("invalid signature {sig:?}: {err}")))
}

/// API version and base info (GET /).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "simdex",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/search",
            "/topk",
            "/reload",
            "/health",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_signatures() {
        assert_eq!(parse_sig("0").unwrap(), 0);
        assert_eq!(parse_sig("dead").unwrap(), 0xDEAD);
        assert_eq!(parse_sig("DEAD").unwrap(), 0xDEAD);
        assert_eq!(parse_sig("ffffffffffffffff").unwrap(), u64::MAX);
    }

    #[test]
    fn rejects_bad_signatures() {
        for bad in ["", "xyz", "0x12", "10000000000000000"] {
            assert!(matches!(parse_sig(bad), Err(ServerError::BadRequest(_))));
        }
    }
}
