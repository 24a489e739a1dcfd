//! Bloom filter doorkeeper for W-TinyLFU admission.
//!
//! A key must be seen once by the doorkeeper before its sketch frequency is
//! allowed to compete with an eviction victim. Bit positions use double hashing
//! (`h += delta` with `delta` a rotation of `h`), capped at 30 positions.
use std::hash::Hash;

use crate::ds::hash::hash_with_seed;

const MAX_HASH_COUNT: u32 = 30;
const BLOOM_SEED: u64 = 0xbc9f_1d34;

#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Sizes the filter for `expected_items` at the given false-positive rate.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = if false_positive_rate.is_finite() && false_positive_rate > 0.0 {
            false_positive_rate.min(0.5)
        } else {
            0.01
        };
        let ln2 = std::f64::consts::LN_2;
        let num_bits = ((-n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / n) * ln2).round() as u32;
        let num_hashes = num_hashes.clamp(1, MAX_HASH_COUNT);
        let words = num_bits.div_ceil(64) as usize;
        Self {
            bits: vec![0; words],
            num_bits,
            num_hashes,
        }
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn contains<K: Hash + ?Sized>(&self, key: &K) -> bool {
        self.bit_positions(key).all(|bit| {
            let (word, mask) = Self::locate(bit);
            self.bits[word] & mask != 0
        })
    }

    pub fn insert<K: Hash + ?Sized>(&mut self, key: &K) {
        for bit in self.bit_positions(key) {
            let (word, mask) = Self::locate(bit);
            self.bits[word] |= mask;
        }
    }

    /// Returns `true` if `key` was already seen; otherwise records it and
    /// returns `false`.
    pub fn allow<K: Hash + ?Sized>(&mut self, key: &K) -> bool {
        if self.contains(key) {
            return true;
        }
        self.insert(key);
        false
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    fn bit_positions<K: Hash + ?Sized>(&self, key: &K) -> impl Iterator<Item = u64> + use<K> {
        let mut h = hash_with_seed(key, BLOOM_SEED);
        let delta = h.rotate_right(17) | 1;
        let num_bits = self.num_bits;
        (0..self.num_hashes).map(move |_| {
            let bit = h % num_bits;
            h = h.wrapping_add(delta);
            bit
        })
    }

    #[inline]
    fn locate(bit: u64) -> (usize, u64) {
        ((bit / 64) as usize, 1u64 << (bit % 64))
    }
}
