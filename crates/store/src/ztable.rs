//! Compressed table representation.
//!
//! Entries are bucketized by the top `b` bits of the permuted hash. Per
//! bucket, the remaining `64 - b` bits are stored sorted as byte-variable
//! deltas, with the docids in a parallel array in the same order. An
//! offset index of `2^b + 1` slots maps a bucket to its byte range and
//! docid run. Amortised cost lands around 12 bytes per entry against 16
//! for the plain layout.
//!
//! Because `b` never exceeds the width of the family's prefix mask, a
//! masked prefix always falls inside a single bucket, and `find` reduces
//! to decoding that bucket.

use crate::hamming::distance;
use crate::table::{Entry, Table};
use crate::MAX_DISTANCE;

/// Byte range and docid range boundary for one bucket.
#[derive(Clone, Copy, Debug, Default)]
struct BucketOffset {
    byte: u32,
    doc: u32,
}

/// A [`Table`] that stores docids once and packs the permuted hashes into
/// a prefix-indexed, delta-compressed block layout.
#[derive(Debug)]
pub struct CompressedTable {
    bucket_bits: u32,
    /// Raw entries while building; drained by `finish`.
    staging: Vec<Entry>,
    tails: Vec<u8>,
    docids: Vec<u64>,
    offsets: Vec<BucketOffset>,
    ready: bool,
}

impl CompressedTable {
    /// A table searching under `mask`, with bucket count derived from the
    /// expected entry count: roughly eight tails per bucket, between 2^8
    /// and 2^16 buckets, and never more buckets than masked prefixes.
    /// Bucket membership subsumes the prefix comparison, so the mask is
    /// consumed here rather than stored.
    pub fn with_capacity(mask: u64, capacity: usize) -> Self {
        Self {
            bucket_bits: bucket_bits_for(capacity, mask),
            staging: Vec::with_capacity(capacity),
            tails: Vec::new(),
            docids: Vec::new(),
            offsets: Vec::new(),
            ready: false,
        }
    }

    #[inline]
    fn tail_shift(&self) -> u32 {
        64 - self.bucket_bits
    }
}

fn bucket_bits_for(capacity: usize, mask: u64) -> u32 {
    let log2 = usize::BITS - capacity.max(1).leading_zeros() - 1;
    log2.saturating_sub(3).clamp(8, 16).min(mask.count_ones())
}

fn write_uvarint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push(v as u8 | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Reads one varint from `buf` starting at `*pos`, advancing `*pos`.
/// The stream is produced by `write_uvarint` and is always well formed.
fn read_uvarint(buf: &[u8], pos: &mut usize) -> u64 {
    let mut v = 0u64;
    let mut shift = 0;
    loop {
        let byte = buf[*pos];
        *pos += 1;
        v |= u64::from(byte & 0x7F) << shift;
        if byte < 0x80 {
            return v;
        }
        shift += 7;
    }
}

impl Table for CompressedTable {
    fn append(&mut self, hash: u64, docid: u64) {
        assert!(!self.ready, "append on a finished table");
        self.staging.push(Entry { hash, docid });
    }

    fn finish(&mut self) {
        if self.ready {
            return;
        }
        self.staging.sort_unstable_by_key(|e| e.hash);

        let shift = self.tail_shift();
        let buckets = 1usize << self.bucket_bits;

        self.offsets = Vec::with_capacity(buckets + 1);
        self.docids = Vec::with_capacity(self.staging.len());
        // Two-byte deltas dominate once buckets hold a handful of tails.
        self.tails = Vec::with_capacity(self.staging.len() * 3);

        let mut i = 0;
        for bucket in 0..buckets as u64 {
            self.offsets.push(BucketOffset {
                byte: self.tails.len() as u32,
                doc: self.docids.len() as u32,
            });
            let mut prev = 0u64;
            while let Some(entry) = self.staging.get(i) {
                if entry.hash >> shift != bucket {
                    break;
                }
                let tail = entry.hash & (u64::MAX >> self.bucket_bits);
                write_uvarint(&mut self.tails, tail - prev);
                prev = tail;
                self.docids.push(entry.docid);
                i += 1;
            }
        }
        self.offsets.push(BucketOffset {
            byte: self.tails.len() as u32,
            doc: self.docids.len() as u32,
        });

        self.staging = Vec::new();
        self.ready = true;
    }

    fn find(&self, sig: u64, out: &mut Vec<u64>) {
        assert!(self.ready, "find on an unfinished table");

        let shift = self.tail_shift();
        let bucket = (sig >> shift) as usize;
        let start = self.offsets[bucket];
        let end = self.offsets[bucket + 1];

        let base = (sig >> shift) << shift;
        let bytes = &self.tails[start.byte as usize..end.byte as usize];
        let mut pos = 0;
        let mut tail = 0u64;
        for &docid in &self.docids[start.doc as usize..end.doc as usize] {
            tail += read_uvarint(bytes, &mut pos);
            if distance(base | tail, sig) <= MAX_DISTANCE {
                out.push(docid);
            }
        }
    }

    fn len(&self) -> usize {
        if self.ready {
            self.docids.len()
        } else {
            self.staging.len()
        }
    }
}
