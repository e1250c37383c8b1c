//! HTTP surface for the simdex near-duplicate service.
//!
//! The server loads a signature file into an immutable [`Snapshot`]
//! (radius-3 store plus optional vp-tree) and serves it over a small REST
//! API:
//!
//! - `GET /` — API information
//! - `GET /health` — liveness probe
//! - `GET /metrics` — Prometheus-style counters
//! - `GET /search?sig=<hex>` — docids within Hamming distance 3
//! - `GET /topk?sig=<hex>&k=<n>` — the k nearest stored fingerprints
//! - `POST /reload` — rebuild the snapshot from the input file
//!
//! Reloads (also triggered by SIGHUP) build a fresh snapshot off the
//! request path and swap it in atomically; in-flight queries finish on
//! the snapshot they started with, and a failed reload leaves the old
//! one serving.
//!
//! [`Snapshot`]: simdex::Snapshot

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
