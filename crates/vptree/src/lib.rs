//! # Vantage-Point Tree
//!
//! Exact top-k search over 64-bit fingerprints under Hamming distance.
//! The radius-3 store answers "everything this close"; this tree answers
//! "the k closest, however far", which backs the `/topk` endpoint.
//!
//! The tree is built once from the full item list and is immutable
//! afterwards, matching the snapshot lifecycle of the store: build, then
//! serve any number of concurrent readers.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use store::distance;

/// A fingerprint paired with its document id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item {
    pub sig: u64,
    pub id: u64,
}

/// One search hit: the stored item and its distance to the query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor {
    pub item: Item,
    pub dist: u32,
}

struct Node {
    item: Item,
    /// Median distance from this vantage point to the items below it.
    threshold: u32,
    inside: Option<Box<Node>>,
    outside: Option<Box<Node>>,
}

/// An immutable vantage-point tree.
pub struct VpTree {
    root: Option<Box<Node>>,
    len: usize,
}

impl VpTree {
    /// Build a tree from `items`. Duplicate signatures and ids are kept
    /// as-is. Building is O(n log n) distance evaluations.
    pub fn build(items: Vec<Item>) -> Self {
        let len = items.len();
        Self {
            root: build_node(items),
            len,
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `k` items nearest to `sig`, ascending by distance. Ties are
    /// broken arbitrarily. Returns fewer than `k` hits only when the tree
    /// holds fewer items.
    pub fn search(&self, sig: u64, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }

        let mut found: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = &self.root {
            search_node(root, sig, k, &mut found);
        }

        found
            .into_sorted_vec()
            .into_iter()
            .map(|entry| entry.0)
            .collect()
    }
}

fn build_node(mut items: Vec<Item>) -> Option<Box<Node>> {
    let vantage = items.pop()?;
    if items.is_empty() {
        return Some(Box::new(Node {
            item: vantage,
            threshold: 0,
            inside: None,
            outside: None,
        }));
    }

    let mid = items.len() / 2;
    items.select_nth_unstable_by_key(mid, |item| distance(item.sig, vantage.sig));
    let threshold = distance(items[mid].sig, vantage.sig);

    let outside = items.split_off(mid);
    Some(Box::new(Node {
        item: vantage,
        threshold,
        inside: build_node(items),
        outside: build_node(outside),
    }))
}

/// Max-heap entry so the worst of the current k candidates sits on top.
struct HeapEntry(Neighbor);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.dist == other.0.dist
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.dist.cmp(&other.0.dist)
    }
}

fn search_node(node: &Node, sig: u64, k: usize, found: &mut BinaryHeap<HeapEntry>) {
    let dist = distance(sig, node.item.sig);
    if found.len() < k {
        found.push(HeapEntry(Neighbor {
            item: node.item,
            dist,
        }));
    } else if dist < found.peek().map_or(u32::MAX, |worst| worst.0.dist) {
        found.pop();
        found.push(HeapEntry(Neighbor {
            item: node.item,
            dist,
        }));
    }

    // Until k candidates are collected the pruning radius stays open.
    let tau = if found.len() < k {
        u32::MAX
    } else {
        found.peek().map_or(u32::MAX, |worst| worst.0.dist)
    };

    let (near, far) = if dist < node.threshold {
        (&node.inside, &node.outside)
    } else {
        (&node.outside, &node.inside)
    };

    if let Some(near) = near {
        search_node(near, sig, k, found);
    }

    // Re-read tau: the near descent may have tightened it.
    let tau = if found.len() < k {
        u32::MAX
    } else {
        found.peek().map_or(tau, |worst| worst.0.dist)
    };

    let crosses = if dist < node.threshold {
        dist.saturating_add(tau) >= node.threshold
    } else {
        dist.saturating_sub(tau) <= node.threshold
    };
    if crosses {
        if let Some(far) = far {
            search_node(far, sig, k, found);
        }
    }
}
