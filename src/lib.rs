//! Workspace umbrella crate for the simdex near-duplicate service.
//!
//! The `simdex` crate re-exports the store, vp-tree, and ingest layers and
//! provides the snapshot pipeline that ties them together: read a
//! signature file once, feed the radius-3 [`Store`] and the top-k
//! [`VpTree`] in a single pass, freeze both, and hand back an immutable
//! [`Snapshot`] ready to serve queries.
//!
//! ## Quick start
//!
//! ```no_run
//! use simdex::{LoadOptions, Storage, StoreOptions, StoreSize, TableKind};
//!
//! # fn demo() -> Result<(), simdex::LoadError> {
//! let options = LoadOptions {
//!     input: "signatures.txt".into(),
//!     store: Some(StoreOptions {
//!         size: StoreSize::Size6,
//!         small: false,
//!         kind: TableKind::Plain,
//!     }),
//!     vptree: true,
//!     shard: simdex::Shard::solo(),
//! };
//!
//! let snapshot = simdex::load_snapshot(&options)?;
//! if let Some(store) = &snapshot.store {
//!     let matches = store.find(0xDEAD_BEEF_CAFE_F00D);
//!     println!("{} near-duplicates", matches.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Hot swap
//!
//! A [`Snapshot`] is never mutated after `load_snapshot` returns. Serving
//! layers keep the current snapshot behind a shared reference and replace
//! the whole thing atomically on reload; in-flight queries keep using the
//! snapshot they started with.

pub use ingest::{IngestError, LoadSummary, Shard};
pub use store::{distance, Storage, Store, StoreError, TableKind, MAX_DISTANCE};
pub use vptree::{Item, Neighbor, VpTree};

pub mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

/// Failures while building a [`Snapshot`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which permutation family backs the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreSize {
    /// 8 tables, 16-bit prefixes.
    Size3,
    /// 16 tables, 28-bit prefixes.
    Size6,
}

impl StoreSize {
    fn as_u8(self) -> u8 {
        match self {
            StoreSize::Size3 => 3,
            StoreSize::Size6 => 6,
        }
    }
}

/// Store construction choices for one load.
#[derive(Clone, Copy, Debug)]
pub struct StoreOptions {
    pub size: StoreSize,
    /// Low-memory preset; only meaningful for [`StoreSize::Size3`], where
    /// it forces the compressed representation.
    pub small: bool,
    pub kind: TableKind,
}

impl StoreOptions {
    fn build(&self, estimate: usize) -> Result<Store, StoreError> {
        if self.size == StoreSize::Size3 && self.small {
            return Ok(Store::size3_small(estimate));
        }
        Store::with_size(self.size.as_u8(), estimate, self.kind)
    }
}

/// Everything one load needs to know.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Path of the signature file.
    pub input: PathBuf,
    /// `None` disables the radius-3 store.
    pub store: Option<StoreOptions>,
    /// Whether to build the top-k tree.
    pub vptree: bool,
    pub shard: Shard,
}

/// An immutable, fully built unit of serving state.
pub struct Snapshot {
    pub store: Option<Arc<dyn Storage>>,
    pub vptree: Option<Arc<VpTree>>,
    /// Signatures accepted by the shard filter during the load.
    pub signatures: u64,
}

/// Builds a [`Snapshot`] from a signature file: count lines, size the
/// structures, stream the file once into both consumers, then freeze.
pub fn load_snapshot(options: &LoadOptions) -> Result<Snapshot, LoadError> {
    let started = Instant::now();

    let total_lines = ingest::count_lines(&options.input)?;
    let estimate = ingest::estimate(total_lines, &options.shard);
    tracing::info!(total_lines, estimate, "loading signatures");

    let mut store = options
        .store
        .as_ref()
        .map(|opts| opts.build(estimate))
        .transpose()?;
    let mut items = options.vptree.then(|| Vec::with_capacity(estimate));

    let summary = ingest::load(&options.input, &options.shard, |docid, sig| {
        if let Some(store) = store.as_mut() {
            store.add(sig, docid);
        }
        if let Some(items) = items.as_mut() {
            items.push(Item { sig, id: docid });
        }
    })?;
    tracing::info!(
        lines = summary.lines,
        accepted = summary.accepted,
        skipped = summary.skipped,
        "signature file read"
    );

    let store = store.map(|mut store| {
        store.finish();
        tracing::info!(tables = store.table_count(), "store ready");
        Arc::new(store) as Arc<dyn Storage>
    });

    let vptree = items.map(|items| {
        let tree = VpTree::build(items);
        tracing::info!(items = tree.len(), "vptree ready");
        Arc::new(tree)
    });

    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "snapshot built");
    Ok(Snapshot {
        store,
        vptree,
        signatures: summary.accepted,
    })
}
