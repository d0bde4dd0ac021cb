//! Deterministic name -> id mapping.
//!
//! Ids are MurmurHash3 (x86, 32-bit, seed 0) of the UTF-8 name, optionally
//! masked down to a bit width imposed by the region format.

/// Bit width of metric item ids.
pub const METRIC_ID_BITS: u32 = 10;
/// Bit width of the cluster id stored in the header.
pub const CLUSTER_ID_BITS: u32 = 12;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// MurmurHash3 x86_32.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= mix_k(k);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let k = tail
            .iter()
            .enumerate()
            .fold(0u32, |k, (i, b)| k | (u32::from(*b) << (8 * i)));
        h ^= mix_k(k);
    }

    // length is folded in mod 2^32, as the reference implementation does
    h ^= data.len() as u32;
    fmix(h)
}

/// Hash `name` into an id. `bits == 0` (or >= 32) keeps all 32 bits,
/// otherwise the result is masked into `[0, 2^bits)`.
pub fn hash(name: &str, bits: u32) -> u32 {
    let h = murmur3_32(name.as_bytes(), 0);
    if bits == 0 || bits >= 32 {
        return h;
    }
    h & ((1u32 << bits) - 1)
}

fn mix_k(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

fn fmix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
