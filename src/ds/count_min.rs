//! Count-Min sketches.
//!
//! Two flavours live here:
//!
//! - [`CountMinSketch`]: `depth x width` saturating `u64` counters sized from
//!   an error bound. Estimates never undercount; the overcount is at most
//!   `epsilon * N` with probability `1 - delta`.
//! - [`FrequencySketch`]: the TinyLFU variant. Four rows of 4-bit counters
//!   packed sixteen to a `u64`, saturating at 15, with periodic halving so
//!   old popularity decays.
//!
//! ```text
//!   row 0: [ 0 | 3 | 0 | 1 | ... ]   h0(key) % width
//!   row 1: [ 2 | 0 | 1 | 0 | ... ]   h1(key) % width
//!   ...
//!   estimate(key) = min over rows
//! ```
use std::hash::Hash;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ds::hash::{hash_with_seed, mix64};
use crate::error::ConfigError;

/// Upper bound on `width * depth` for a [`CountMinSketch`] (128 MiB of
/// counters).
pub const MAX_SKETCH_COUNTERS: usize = 1 << 24;

/// Count-Min Sketch with saturating `u64` counters.
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    width: usize,
    depth: usize,
    counters: Vec<u64>,
    seeds: Vec<u64>,
}

impl CountMinSketch {
    /// Sizes the sketch as `width = ceil(2 / epsilon)` and
    /// `depth = ceil(ln(1 / delta))`, with a minimum depth of one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] unless `epsilon` is in `(0, 1]` and `delta`
    /// is in `(0, 1)`, or when the resulting table would exceed
    /// [`MAX_SKETCH_COUNTERS`].
    pub fn with_error_bounds(epsilon: f64, delta: f64) -> Result<Self, ConfigError> {
        let width = Self::width_for(epsilon)?;
        let depth = Self::depth_for(delta)?;
        Self::with_dimensions(width, depth)
    }

    /// Row width for an additive error of `epsilon * N`.
    pub fn width_for(epsilon: f64) -> Result<usize, ConfigError> {
        if !epsilon.is_finite() || epsilon <= 0.0 || epsilon > 1.0 {
            return Err(ConfigError::new(format!(
                "epsilon must be in (0, 1], got {epsilon}"
            )));
        }
        let width = (2.0 / epsilon).ceil();
        if width > MAX_SKETCH_COUNTERS as f64 {
            return Err(ConfigError::new(format!(
                "epsilon {epsilon} needs {width} counters per row, over the \
                 {MAX_SKETCH_COUNTERS} counter budget"
            )));
        }
        Ok(width as usize)
    }

    /// Row count for a failure probability of `delta`.
    pub fn depth_for(delta: f64) -> Result<usize, ConfigError> {
        if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
            return Err(ConfigError::new(format!(
                "delta must be in (0, 1), got {delta}"
            )));
        }
        Ok(((1.0 / delta).ln().ceil() as usize).max(1))
    }

    /// Builds a sketch with explicit dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either dimension is zero or
    /// `width * depth` exceeds [`MAX_SKETCH_COUNTERS`].
    pub fn with_dimensions(width: usize, depth: usize) -> Result<Self, ConfigError> {
        if width == 0 || depth == 0 {
            return Err(ConfigError::new(format!(
                "sketch dimensions must be non-zero, got {width}x{depth}"
            )));
        }
        let Some(cells) = width
            .checked_mul(depth)
            .filter(|cells| *cells <= MAX_SKETCH_COUNTERS)
        else {
            return Err(ConfigError::new(format!(
                "sketch of {width}x{depth} exceeds the {MAX_SKETCH_COUNTERS} counter budget"
            )));
        };
        let seeds = (0..depth as u64)
            .map(|row| mix64(row.wrapping_add(1).wrapping_mul(0x9e37_79b9)))
            .collect();
        Ok(Self {
            width,
            depth,
            counters: vec![0; cells],
            seeds,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn increment<K: Hash + ?Sized>(&mut self, key: &K) {
        for row in 0..self.depth {
            let slot = self.slot(row, key);
            self.counters[slot] = self.counters[slot].saturating_add(1);
        }
    }

    /// Row minimum; never below the true count.
    pub fn estimate<K: Hash + ?Sized>(&self, key: &K) -> u64 {
        (0..self.depth)
            .map(|row| self.counters[self.slot(row, key)])
            .min()
            .unwrap_or(0)
    }

    #[inline]
    fn slot<K: Hash + ?Sized>(&self, row: usize, key: &K) -> usize {
        let column = (hash_with_seed(key, self.seeds[row]) % self.width as u64) as usize;
        row * self.width + column
    }
}

const ROWS: usize = 4;
const COUNTERS_PER_WORD: usize = 16;
const COUNTER_MAX: u64 = 15;
const HALVE_MASK: u64 = 0x7777_7777_7777_7777;

/// TinyLFU frequency sketch: 4 rows of 4-bit saturating counters.
#[derive(Debug, Clone)]
pub struct FrequencySketch {
    width: usize,
    words_per_row: usize,
    table: Vec<u64>,
    seeds: [u64; ROWS],
}

impl FrequencySketch {
    /// `width` is rounded up to a power of two, minimum 8 counters per row.
    pub fn new(width: usize, seed: u64) -> Self {
        let width = width.max(8).next_power_of_two();
        let words_per_row = width.div_ceil(COUNTERS_PER_WORD);
        let mut rng = SmallRng::seed_from_u64(seed);
        let seeds = std::array::from_fn(|_| rng.random::<u64>());
        Self {
            width,
            words_per_row,
            table: vec![0; words_per_row * ROWS],
            seeds,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bumps every row counter for `key` that is below the 4-bit ceiling.
    pub fn increment<K: Hash + ?Sized>(&mut self, key: &K) {
        for row in 0..ROWS {
            let (word, shift) = self.position(row, key);
            let current = (self.table[word] >> shift) & COUNTER_MAX;
            if current < COUNTER_MAX {
                self.table[word] += 1 << shift;
            }
        }
    }

    pub fn frequency<K: Hash + ?Sized>(&self, key: &K) -> u8 {
        (0..ROWS)
            .map(|row| {
                let (word, shift) = self.position(row, key);
                ((self.table[word] >> shift) & COUNTER_MAX) as u8
            })
            .min()
            .unwrap_or(0)
    }

    /// Halves every counter at once.
    pub fn halve(&mut self) {
        for word in &mut self.table {
            *word = (*word >> 1) & HALVE_MASK;
        }
    }

    #[inline]
    fn position<K: Hash + ?Sized>(&self, row: usize, key: &K) -> (usize, u32) {
        let column = (hash_with_seed(key, self.seeds[row]) as usize) & (self.width - 1);
        let word = row * self.words_per_row + column / COUNTERS_PER_WORD;
        let shift = ((column % COUNTERS_PER_WORD) * 4) as u32;
        (word, shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod count_min {
        use super::*;

        #[test]
        fn dimensions_follow_error_bounds() {
            let sketch = CountMinSketch::with_error_bounds(0.25, 0.01).unwrap();
            assert_eq!(sketch.width(), 8);
            assert_eq!(sketch.depth(), 5);
        }

        #[test]
        fn depth_never_zero() {
            let sketch = CountMinSketch::with_error_bounds(1.0, 0.9).unwrap();
            assert_eq!(sketch.depth(), 1);
            assert_eq!(sketch.width(), 2);
        }

        #[test]
        fn rejects_out_of_range_bounds() {
            assert!(CountMinSketch::with_error_bounds(0.0, 0.1).is_err());
            assert!(CountMinSketch::with_error_bounds(1.5, 0.1).is_err());
            assert!(CountMinSketch::with_error_bounds(0.1, 0.0).is_err());
            assert!(CountMinSketch::with_error_bounds(0.1, 1.0).is_err());
            assert!(CountMinSketch::with_error_bounds(f64::NAN, 0.1).is_err());
        }

        #[test]
        fn rejects_tables_over_budget() {
            let err = CountMinSketch::with_error_bounds(1e-300, 0.5).unwrap_err();
            assert!(err.message().contains("epsilon"), "{err}");
            assert!(CountMinSketch::with_error_bounds(1e-9, 0.5).is_err());
            assert!(CountMinSketch::with_dimensions(usize::MAX, 2).is_err());
            assert!(CountMinSketch::with_dimensions(MAX_SKETCH_COUNTERS, 2).is_err());
        }

        #[test]
        fn estimate_never_undercounts() {
            let mut sketch = CountMinSketch::with_dimensions(16, 3).unwrap();
            for i in 0..200u64 {
                for _ in 0..(i % 5) {
                    sketch.increment(&i);
                }
            }
            for i in 0..200u64 {
                assert!(sketch.estimate(&i) >= i % 5);
            }
        }
    }

    mod frequency {
        use super::*;

        #[test]
        fn width_rounds_to_power_of_two() {
            assert_eq!(FrequencySketch::new(0, 1).width(), 8);
            assert_eq!(FrequencySketch::new(100, 1).width(), 128);
        }

        #[test]
        fn counters_saturate_at_fifteen() {
            let mut sketch = FrequencySketch::new(64, 7);
            for _ in 0..40 {
                sketch.increment("hot");
            }
            assert_eq!(sketch.frequency("hot"), 15);
        }

        #[test]
        fn halve_decays_counts() {
            let mut sketch = FrequencySketch::new(64, 7);
            for _ in 0..10 {
                sketch.increment("k");
            }
            let before = sketch.frequency("k");
            sketch.halve();
            assert_eq!(sketch.frequency("k"), before / 2);
        }

        #[test]
        fn same_seed_same_layout() {
            let mut a = FrequencySketch::new(64, 3);
            let mut b = FrequencySketch::new(64, 3);
            for i in 0..50u32 {
                a.increment(&i);
                b.increment(&i);
            }
            for i in 0..50u32 {
                assert_eq!(a.frequency(&i), b.frequency(&i));
            }
        }
    }
}
