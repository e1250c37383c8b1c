//! Hamming distance between 64-bit fingerprints.

/// Returns the number of bit positions in which `a` and `b` differ.
///
/// Branch-free SWAR population count of `a ^ b`; see
/// <http://graphics.stanford.edu/~seander/bithacks.html#CountBitsSetParallel>.
/// Produces the same result as `(a ^ b).count_ones()` but does not depend
/// on the target having a popcount instruction.
#[inline]
pub fn distance(a: u64, b: u64) -> u32 {
    let mut x = a ^ b;

    x -= (x >> 1) & 0x5555_5555_5555_5555;
    x = ((x >> 2) & 0x3333_3333_3333_3333) + (x & 0x3333_3333_3333_3333);
    x = (x + (x >> 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    (x.wrapping_mul(0x0101_0101_0101_0101) >> 56) as u32
}
