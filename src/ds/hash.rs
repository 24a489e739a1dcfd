//! Seeded key hashing for sketches, bloom filters and ghost fingerprints.
//!
//! `FxHasher` is fast but its output has weak low bits, and every sketch row
//! reduces hashes modulo a small width. The raw Fx hash is therefore passed
//! through the splitmix64 finalizer before use.
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// splitmix64 output mix.
#[inline]
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hashes `key` under `seed`. Different seeds give independent functions.
#[inline]
pub fn hash_with_seed<K: Hash + ?Sized>(key: &K, seed: u64) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(seed);
    key.hash(&mut hasher);
    mix64(hasher.finish() ^ seed)
}

/// Stable 64-bit fingerprint used where only key identity is remembered.
#[inline]
pub fn fingerprint<K: Hash + ?Sized>(key: &K) -> u64 {
    hash_with_seed(key, 0x9e37_79b9_7f4a_7c15)
}
