//! The store: one table per permutation, a shared two-phase lifecycle.

use hashbrown::HashSet;
use rayon::prelude::*;
use thiserror::Error;

use crate::permute::PermutationFamily;
use crate::table::{PlainTable, Table};
use crate::ztable::CompressedTable;

/// Errors reported at store construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown store size: {0} (expected 3 or 6)")]
    UnknownSize(u8),
}

/// Which table representation a store uses, uniformly across all tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    /// Sorted `(hash, docid)` array.
    Plain,
    /// Prefix-bucketized, delta-compressed layout.
    Compressed,
}

impl TableKind {
    fn build(self, mask: u64, capacity: usize) -> Box<dyn Table> {
        match self {
            TableKind::Plain => Box::new(PlainTable::with_capacity(mask, capacity)),
            TableKind::Compressed => Box::new(CompressedTable::with_capacity(mask, capacity)),
        }
    }
}

/// The capability consumed by collaborators: stream signatures in, freeze,
/// then query concurrently.
pub trait Storage: Send + Sync {
    /// Insert a signature and document id. Building phase only; single
    /// writer.
    fn add(&mut self, sig: u64, docid: u64);

    /// Sort every table and transition to the ready phase. Blocks until
    /// all tables are sorted. Idempotent.
    fn finish(&mut self);

    /// All docids whose stored signature lies within
    /// [`MAX_DISTANCE`](crate::MAX_DISTANCE) of `sig`, each at most once,
    /// in unspecified order. Ready phase only; any number of concurrent
    /// callers.
    fn find(&self, sig: u64) -> Vec<u64>;

    /// Number of signatures added.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A storage engine for 64-bit SimHash signatures, hard-coded for Hamming
/// distance 3.
#[derive(Debug)]
pub struct Store {
    family: PermutationFamily,
    tables: Vec<Box<dyn Table>>,
    ready: bool,
}

impl Store {
    /// The default configuration: 16 tables under 28-bit prefixes.
    /// `estimate` pre-reserves per-table capacity (plus 5% headroom).
    pub fn size6(estimate: usize, kind: TableKind) -> Self {
        Self::from_family(PermutationFamily::size6(), estimate, kind)
    }

    /// The 8-table configuration: half the memory of [`Store::size6`] at
    /// the cost of far larger candidate segments per probe.
    pub fn size3(estimate: usize, kind: TableKind) -> Self {
        Self::from_family(PermutationFamily::size3(), estimate, kind)
    }

    /// The low-memory size-3 configuration; always uses the compressed
    /// table representation, which is why it takes no [`TableKind`].
    pub fn size3_small(estimate: usize) -> Self {
        Self::size3(estimate, TableKind::Compressed)
    }

    /// Dispatch on a runtime size selector. Sizes other than 3 and 6 are
    /// rejected.
    pub fn with_size(size: u8, estimate: usize, kind: TableKind) -> Result<Self, StoreError> {
        match size {
            3 => Ok(Self::size3(estimate, kind)),
            6 => Ok(Self::size6(estimate, kind)),
            other => Err(StoreError::UnknownSize(other)),
        }
    }

    fn from_family(family: PermutationFamily, estimate: usize, kind: TableKind) -> Self {
        let capacity = estimate + estimate / 20;
        let tables = family
            .perms()
            .iter()
            .map(|_| kind.build(family.mask(), capacity))
            .collect();
        Self {
            family,
            tables,
            ready: false,
        }
    }

    /// Number of tables (one per permutation).
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl Storage for Store {
    fn add(&mut self, sig: u64, docid: u64) {
        assert!(!self.ready, "add on a finished store");
        for (perm, table) in self.family.perms().iter().zip(&mut self.tables) {
            table.append(perm.apply(sig), docid);
        }
    }

    fn finish(&mut self) {
        if self.ready {
            return;
        }
        self.tables.par_iter_mut().for_each(|table| table.finish());
        self.ready = true;
    }

    fn find(&self, sig: u64) -> Vec<u64> {
        assert!(self.ready, "find on an unfinished store");

        let mut ids = Vec::new();
        for (perm, table) in self.family.perms().iter().zip(&self.tables) {
            table.find(perm.apply(sig), &mut ids);
        }

        let mut seen = HashSet::with_capacity(ids.len());
        ids.retain(|id| seen.insert(*id));
        ids
    }

    fn len(&self) -> usize {
        self.tables.first().map_or(0, |t| t.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn configurations() -> Vec<(&'static str, Store)> {
        vec![
            ("size6/plain", Store::size6(16, TableKind::Plain)),
            ("size6/compressed", Store::size6(16, TableKind::Compressed)),
            ("size3/plain", Store::size3(16, TableKind::Plain)),
            ("size3/small", Store::size3_small(16)),
        ]
    }

    fn sorted_find(store: &Store, sig: u64) -> Vec<u64> {
        let mut ids = store.find(sig);
        ids.sort_unstable();
        ids
    }

    #[test]
    fn exact_match() {
        for (name, mut store) in configurations() {
            store.add(0x0000_0000_0000_0000, 1);
            store.finish();
            assert_eq!(sorted_find(&store, 0x0000_0000_0000_0000), vec![1], "{name}");
        }
    }

    #[test]
    fn within_radius() {
        for (name, mut store) in configurations() {
            store.add(0x0000_0000_0000_00FF, 7);
            store.finish();
            // distance 1
            assert_eq!(sorted_find(&store, 0x0000_0000_0000_00FB), vec![7], "{name}");
        }
    }

    #[test]
    fn at_the_boundary() {
        for (name, mut store) in configurations() {
            store.add(0xAAAA_AAAA_AAAA_AAAA, 42);
            store.finish();
            // distance 3
            assert_eq!(sorted_find(&store, 0xAAAA_AAAA_AAAA_AAA1), vec![42], "{name}");
        }
    }

    #[test]
    fn just_outside() {
        for (name, mut store) in configurations() {
            store.add(0xAAAA_AAAA_AAAA_AAAA, 42);
            store.finish();
            // distance 4
            assert!(sorted_find(&store, 0xAAAA_AAAA_AAAA_AA00).is_empty(), "{name}");
        }
    }

    #[test]
    fn duplicate_docid_dedup() {
        for (name, mut store) in configurations() {
            store.add(0x0F0F_0F0F_0F0F_0F0F, 9);
            store.add(0x0F0F_0F0F_0F0F_0F0E, 9);
            store.finish();
            assert_eq!(sorted_find(&store, 0x0F0F_0F0F_0F0F_0F0F), vec![9], "{name}");
        }
    }

    #[test]
    fn multiple_hits() {
        for (name, mut store) in configurations() {
            store.add(0x00, 1);
            store.add(0x01, 2);
            store.add(0x03, 3);
            store.add(0x07, 4);
            store.add(0x0F, 5); // distance 4; must not match
            store.finish();
            assert_eq!(sorted_find(&store, 0x00), vec![1, 2, 3, 4], "{name}");
        }
    }

    #[test]
    fn empty_store_finds_nothing() {
        for (name, mut store) in configurations() {
            store.finish();
            assert!(store.is_empty());
            assert!(store.find(0xDEAD_BEEF_0000_0000).is_empty(), "{name}");
        }
    }

    #[test]
    fn with_size_dispatch() {
        assert_eq!(
            Store::with_size(6, 0, TableKind::Plain).unwrap().table_count(),
            16
        );
        assert_eq!(
            Store::with_size(3, 0, TableKind::Plain).unwrap().table_count(),
            8
        );
        assert_eq!(
            Store::with_size(4, 0, TableKind::Plain).unwrap_err(),
            StoreError::UnknownSize(4)
        );
    }

    #[test]
    fn finish_is_idempotent() {
        let mut store = Store::size6(1, TableKind::Plain);
        store.add(1, 1);
        store.finish();
        store.finish();
        assert_eq!(store.find(1), vec![1]);
    }

    #[test]
    #[should_panic(expected = "add on a finished store")]
    fn add_after_finish_panics() {
        let mut store = Store::size6(0, TableKind::Plain);
        store.finish();
        store.add(1, 1);
    }

    #[test]
    #[should_panic(expected = "find on an unfinished store")]
    fn find_before_finish_panics() {
        let store = Store::size6(0, TableKind::Plain);
        store.find(1);
    }

    /// Every query within distance 3 of a stored signature must recall it,
    /// for every error pattern of weight 0..=3.
    fn assert_full_recall(mut store: Store) {
        let mut rng = StdRng::seed_from_u64(0xF1D0);
        let sigs: Vec<u64> = (0..2).map(|_| rng.gen()).collect();
        for (docid, &sig) in sigs.iter().enumerate() {
            store.add(sig, docid as u64);
        }
        store.finish();

        for (docid, &sig) in sigs.iter().enumerate() {
            // i <= j <= k enumerates every error mask of weight 1, 2, 3
            for i in 0..64 {
                for j in i..64 {
                    for k in j..64 {
                        let error = (1u64 << i) | (1u64 << j) | (1u64 << k);
                        assert!(
                            store.find(sig ^ error).contains(&(docid as u64)),
                            "missed {sig:#018x} under error {error:#018x}"
                        );
                    }
                }
            }
            // weight 0
            assert!(store.find(sig).contains(&(docid as u64)));
        }
    }

    #[test]
    fn size6_full_recall() {
        assert_full_recall(Store::size6(2, TableKind::Plain));
    }

    #[test]
    fn size3_full_recall() {
        assert_full_recall(Store::size3(2, TableKind::Plain));
    }

    #[test]
    fn compressed_full_recall() {
        assert_full_recall(Store::size6(2, TableKind::Compressed));
    }

    /// Returned docids always map back to a signature within the radius.
    #[test]
    fn no_false_acceptance() {
        let mut rng = StdRng::seed_from_u64(0xACCE);
        for (name, mut store) in configurations() {
            let sigs: Vec<u64> = (0..1_000).map(|_| rng.gen()).collect();
            for (docid, &sig) in sigs.iter().enumerate() {
                store.add(sig, docid as u64);
            }
            store.finish();

            for _ in 0..2_000 {
                let query: u64 = if rng.gen_bool(0.5) {
                    rng.gen()
                } else {
                    // perturb a stored signature by up to 6 bits
                    let mut q = sigs[rng.gen_range(0..sigs.len())];
                    for _ in 0..rng.gen_range(0..=6) {
                        q ^= 1u64 << rng.gen_range(0..64);
                    }
                    q
                };
                for id in store.find(query) {
                    let sig = sigs[id as usize];
                    assert!(
                        crate::distance(sig, query) <= crate::MAX_DISTANCE,
                        "{name}: {id} at distance {} from {query:#018x}",
                        crate::distance(sig, query)
                    );
                }
            }
        }
    }

    /// Same input stream, same answers, whichever table flavor backs the
    /// store.
    #[test]
    fn compressed_equals_plain() {
        let mut rng = StdRng::seed_from_u64(0xC0DE);
        for size in [3u8, 6] {
            let mut plain = Store::with_size(size, 500, TableKind::Plain).unwrap();
            let mut compressed = Store::with_size(size, 500, TableKind::Compressed).unwrap();

            let sigs: Vec<u64> = (0..500).map(|_| rng.gen()).collect();
            for (docid, &sig) in sigs.iter().enumerate() {
                plain.add(sig, docid as u64);
                compressed.add(sig, docid as u64);
            }
            plain.finish();
            compressed.finish();

            for _ in 0..2_000 {
                let mut query = sigs[rng.gen_range(0..sigs.len())];
                for _ in 0..rng.gen_range(0..=4) {
                    query ^= 1u64 << rng.gen_range(0..64);
                }
                assert_eq!(
                    sorted_find(&plain, query),
                    sorted_find(&compressed, query),
                    "size {size} diverged for {query:#018x}"
                );
            }
        }
    }

    /// A finished store is safe to share across reader threads.
    #[test]
    fn concurrent_readers() {
        let mut store = Store::size6(100, TableKind::Plain);
        let mut rng = StdRng::seed_from_u64(7);
        let sigs: Vec<u64> = (0..100).map(|_| rng.gen()).collect();
        for (docid, &sig) in sigs.iter().enumerate() {
            store.add(sig, docid as u64);
        }
        store.finish();

        let store = std::sync::Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                let sigs = sigs.clone();
                std::thread::spawn(move || {
                    for (docid, &sig) in sigs.iter().enumerate() {
                        assert!(store.find(sig ^ 1).contains(&(docid as u64)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
