//! The fixed bit-permutation families behind the table layout.
//!
//! A permutation rearranges a 64-bit fingerprint so that one group of bits
//! lands in the high-order prefix covered by the family's mask. The family
//! guarantees that for any two words within Hamming distance
//! [`MAX_DISTANCE`](crate::MAX_DISTANCE), at least one permutation maps
//! both words to the same masked prefix. `apply` and `invert` are pure;
//! the `(rotation, swap)` binding of each table index is part of the
//! store's identity and must not be reordered.

/// Intra-word swap of the 12-bit block at bits `[36, 48)` with one of the
/// lower 12-bit blocks. Applied after the rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockSwap {
    /// Leave the rotated word as-is.
    None,
    /// Swap with the block at bits `[24, 36)`.
    At24,
    /// Swap with the block at bits `[12, 24)`.
    At12,
    /// Swap with the block at bits `[0, 12)`.
    At0,
}

impl BlockSwap {
    /// Swaps are involutions: applying one twice restores the word.
    #[inline]
    fn apply(self, x: u64) -> u64 {
        match self {
            BlockSwap::None => x,
            BlockSwap::At24 => {
                (x & 0xFFFF_0000_00FF_FFFF)
                    | ((x & 0x0000_FFF0_0000_0000) >> 12)
                    | ((x & 0x0000_000F_FF00_0000) << 12)
            }
            BlockSwap::At12 => {
                (x & 0xFFFF_000F_FF00_0FFF)
                    | ((x & 0x0000_FFF0_0000_0000) >> 24)
                    | ((x & 0x0000_0000_00FF_F000) << 24)
            }
            BlockSwap::At0 => {
                (x & 0xFFFF_000F_FFFF_F000)
                    | ((x & 0x0000_FFF0_0000_0000) >> 36)
                    | ((x & 0x0000_0000_0000_0FFF) << 36)
            }
        }
    }
}

/// One fixed bijection on 64-bit words: a left rotation followed by an
/// optional 12-bit block swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permutation {
    rotate: u32,
    swap: BlockSwap,
}

impl Permutation {
    /// Permute `x`.
    #[inline]
    pub fn apply(&self, x: u64) -> u64 {
        self.swap.apply(x.rotate_left(self.rotate))
    }

    /// Undo [`Permutation::apply`]: `invert(apply(x)) == x` for every `x`.
    #[inline]
    pub fn invert(&self, y: u64) -> u64 {
        self.swap.apply(y).rotate_right(self.rotate)
    }
}

/// An ordered, immutable family of permutations plus the prefix mask its
/// tables search under. Table `t` of a store is bound to permutation `t`
/// for its whole lifetime.
#[derive(Clone, Debug)]
pub struct PermutationFamily {
    perms: Vec<Permutation>,
    mask: u64,
}

impl PermutationFamily {
    /// The default 16-permutation family: four 16-bit rotations, each with
    /// the identity and the three block swaps, searched under a 28-bit
    /// prefix.
    ///
    /// With at most three differing bits, some 16-bit quarter of the word
    /// is clean and some rotation moves it into the top 16 bits; of the
    /// four 12-bit blocks below it, one is also clean, and the matching
    /// swap moves it into bits `[36, 48)`. That table's masked prefix is
    /// then identical for both words.
    pub fn size6() -> Self {
        let mut perms = Vec::with_capacity(16);
        for i in 0..4 {
            for swap in [BlockSwap::None, BlockSwap::At24, BlockSwap::At12, BlockSwap::At0] {
                perms.push(Permutation { rotate: 16 * i, swap });
            }
        }
        Self {
            perms,
            mask: 0xFFFF_FFF0_0000_0000,
        }
    }

    /// The 8-permutation family: byte-aligned rotations exposing each
    /// adjacent pair of 8-bit chunks as the top 16 bits, searched under a
    /// 16-bit prefix. Half the memory of [`PermutationFamily::size6`], far
    /// more candidates per probe.
    ///
    /// Three differing bits touch at most three of the eight chunks and so
    /// dirty at most six of the eight adjacent pairs; at least two tables
    /// keep a clean prefix.
    pub fn size3() -> Self {
        let perms = (0..8u32)
            .map(|t| Permutation {
                rotate: (48 + 64 - 8 * t) % 64,
                swap: BlockSwap::None,
            })
            .collect();
        Self {
            perms,
            mask: 0xFFFF_0000_0000_0000,
        }
    }

    /// The prefix mask all tables of this family search under.
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Number of permutations (and therefore tables).
    #[inline]
    pub fn len(&self) -> usize {
        self.perms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.perms.is_empty()
    }

    /// The permutations in table order.
    #[inline]
    pub fn perms(&self) -> &[Permutation] {
        &self.perms
    }
}
