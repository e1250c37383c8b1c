//! # Fingerprint Store
//!
//! This crate implements a storage layer for 64-bit SimHash fingerprints
//! that answers radius-3 Hamming-distance queries, following the
//! permutation-table scheme from section 3 of "Detecting Near-Duplicates
//! for Web Crawling" (Manku, Jain, and Sarma).
//!
//! ## How it works
//!
//! Every signature is inserted once per table, with a fixed bit permutation
//! applied first. Each permutation is chosen so that, for any query within
//! Hamming distance 3 of a stored signature, at least one table holds the
//! stored entry under a permutation that leaves the leading prefix bits
//! untouched by the differing bits. A query then becomes, per table, a
//! binary search to the shared prefix followed by a short scan with an
//! exact distance check.
//!
//! ## Lifecycle
//!
//! A [`Store`] is built in two phases:
//!
//! 1. **Building** — stream `(signature, docid)` pairs through
//!    [`Storage::add`]. Single writer; the store must not be queried.
//! 2. **Ready** — after [`Storage::finish`] (which sorts every table in
//!    parallel) the store is immutable and safe for any number of
//!    concurrent [`Storage::find`] callers.
//!
//! Calling `add` after `finish`, or `find` before it, is a programming
//! error and panics.
//!
//! ## Table flavors
//!
//! Two table representations share one contract, selected by
//! [`TableKind`]: a plain sorted `(hash, docid)` array, and a compressed
//! layout that bucketizes by hash prefix and delta-encodes the remaining
//! bits. The compressed form trades decode work on the query path for
//! roughly 12 bytes per entry instead of 16.
//!
//! ## Example
//!
//! ```
//! use store::{Storage, Store, TableKind};
//!
//! let mut store = Store::size6(4, TableKind::Plain);
//! store.add(0x00000000000000FF, 7);
//! store.finish();
//!
//! // distance 1 from the stored signature
//! assert_eq!(store.find(0x00000000000000FB), vec![7]);
//! ```

mod hamming;
mod permute;
mod store;
mod table;
mod ztable;

pub use crate::store::{Storage, Store, StoreError, TableKind};
pub use hamming::distance;
pub use permute::{Permutation, PermutationFamily};
pub use table::{Entry, PlainTable, Table};
pub use ztable::CompressedTable;

/// Maximum Hamming distance a query may have from a stored signature and
/// still match. The permutation families are built for exactly this radius.
pub const MAX_DISTANCE: u32 = 3;
