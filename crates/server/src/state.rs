use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use simdex::config::ServiceConfig;
use simdex::{LoadError, LoadOptions, Snapshot};

/// Request and load counters surfaced by `/metrics`.
#[derive(Debug, Default)]
pub struct Metrics {
    pub requests: AtomicU64,
    pub signatures: AtomicU64,
    pub reloads: AtomicU64,
}

impl Metrics {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared application state
pub struct ServerState {
    /// Service configuration
    pub config: Arc<ServiceConfig>,

    /// Load pipeline options derived from the configuration once.
    options: LoadOptions,

    /// The currently served snapshot. Replaced wholesale on reload;
    /// handlers clone the `Arc` once and never observe a partial swap.
    snapshot: RwLock<Arc<Snapshot>>,

    /// Request/load counters
    pub metrics: Metrics,
}

impl ServerState {
    /// Create server state by building the initial snapshot from the
    /// configured input file. Blocks until the snapshot is ready.
    pub fn new(config: ServiceConfig) -> Result<Self, LoadError> {
        let options = config.load_options();
        let snapshot = simdex::load_snapshot(&options)?;

        let metrics = Metrics::default();
        metrics
            .signatures
            .store(snapshot.signatures, Ordering::Relaxed);

        Ok(Self {
            config: Arc::new(config),
            options,
            snapshot: RwLock::new(Arc::new(snapshot)),
            metrics,
        })
    }

    /// The snapshot to serve this request from.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild a snapshot from the input file and swap it in. On failure
    /// the current snapshot keeps serving. Returns the number of
    /// signatures loaded.
    ///
    /// Blocking; run it on a blocking task from async contexts.
    pub fn reload(&self) -> Result<u64, LoadError> {
        let snapshot = simdex::load_snapshot(&self.options)?;
        let signatures = snapshot.signatures;

        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(snapshot);

        self.metrics.signatures.store(signatures, Ordering::Relaxed);
        self.metrics.reloads.fetch_add(1, Ordering::Relaxed);
        Ok(signatures)
    }
}
