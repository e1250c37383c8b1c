//! Sorted per-permutation tables and the capability they share.

use crate::hamming::distance;
use crate::MAX_DISTANCE;

/// One stored record: the permuted signature and the caller's document id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub hash: u64,
    pub docid: u64,
}

/// Contract shared by the table representations.
///
/// A table is a bag of entries while building and an immutable sorted
/// index once finished. `append` after `finish`, or `find` before it, is
/// a phase violation and panics; the store enforces the same discipline
/// one level up.
pub trait Table: Send + Sync + std::fmt::Debug {
    /// Record one `(permuted hash, docid)` pair. Building phase only.
    fn append(&mut self, hash: u64, docid: u64);

    /// Sort the entries and freeze the table. Idempotent.
    fn finish(&mut self);

    /// Append to `out` the docid of every entry whose hash shares the
    /// masked prefix of `sig` and lies within [`MAX_DISTANCE`] of it.
    /// `sig` must already be permuted by this table's permutation.
    /// Duplicates are passed through; the store dedups across tables.
    fn find(&self, sig: u64, out: &mut Vec<u64>);

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The plain representation: a flat `(hash, docid)` array, sorted by hash
/// on `finish`. Sixteen bytes per entry, no decode work on the query path.
#[derive(Clone, Debug)]
pub struct PlainTable {
    entries: Vec<Entry>,
    mask: u64,
    ready: bool,
}

impl PlainTable {
    /// A table searching under `mask`, with room for `capacity` entries.
    pub fn with_capacity(mask: u64, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            mask,
            ready: false,
        }
    }
}

impl Table for PlainTable {
    fn append(&mut self, hash: u64, docid: u64) {
        assert!(!self.ready, "append on a finished table");
        self.entries.push(Entry { hash, docid });
    }

    fn finish(&mut self) {
        if self.ready {
            return;
        }
        self.entries.sort_unstable_by_key(|e| e.hash);
        self.ready = true;
    }

    fn find(&self, sig: u64, out: &mut Vec<u64>) {
        assert!(self.ready, "find on an unfinished table");

        let prefix = sig & self.mask;
        let mut i = self.entries.partition_point(|e| e.hash < prefix);
        while let Some(entry) = self.entries.get(i) {
            if entry.hash & self.mask != prefix {
                break;
            }
            // Full 64-bit distance of the permuted forms; equal to the
            // distance of the originals because the permutation is a
            // bijection on bits.
            if distance(entry.hash, sig) <= MAX_DISTANCE {
                out.push(entry.docid);
            }
            i += 1;
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
