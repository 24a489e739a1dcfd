//! Count-Min Sketch + LRU window heat separator.
//!
//! Every access bumps a [`CountMinSketch`] and refreshes the key in an LRU
//! window of `window_size` keys. A key is hot when it is still inside the
//! window *and* its sketch estimate has reached `threshold`. The sketch
//! never undercounts, so a key that truly crossed the threshold inside the
//! window is always reported; collisions can only add false positives.
//!
//! ```text
//!   access(k) ──► sketch.increment(k)
//!            └──► window.push_front(k) ──► pop_back() while len > window_size
//!
//!   hot(k) = window.contains(k) && sketch.estimate(k) >= threshold
//! ```
//!
//! With `enable_lru = false` the window never evicts and grows with the key
//! space.
use std::fmt::{self, Debug};
use std::hash::Hash;

use crate::builder::SeparatorKind;
use crate::ds::{CountMinSketch, RecencyList};
use crate::error::{ConfigError, SeparatorError};
use crate::traits::HeatSeparator;

#[derive(Debug)]
pub struct SketchSeparator<K> {
    sketch: CountMinSketch,
    window: RecencyList<K>,
    window_size: usize,
    threshold: u64,
    enable_lru: bool,
}

impl<K> SketchSeparator<K>
where
    K: Clone + Eq + Hash,
{
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the error bounds are out of range or
    /// `threshold` is zero.
    pub fn try_new(
        window_size: usize,
        epsilon: f64,
        delta: f64,
        threshold: u64,
        enable_lru: bool,
    ) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::new("threshold must be at least 1"));
        }
        let sketch = CountMinSketch::with_error_bounds(epsilon, delta)?;
        Ok(Self {
            sketch,
            window: RecencyList::with_capacity(if enable_lru { window_size } else { 0 }),
            window_size,
            threshold,
            enable_lru,
        })
    }

    /// Sketch estimate for `key`; never below its true access count.
    pub fn estimate(&self, key: &K) -> u64 {
        self.sketch.estimate(key)
    }

    pub fn sketch_dimensions(&self) -> (usize, usize) {
        (self.sketch.width(), self.sketch.depth())
    }

    fn record(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.enable_lru && self.window_size == 0 {
            return Err(SeparatorError::Capacity);
        }
        self.sketch.increment(key);
        self.window.push_front(key.clone());
        if self.enable_lru {
            while self.window.len() > self.window_size {
                self.window.pop_back();
            }
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for SketchSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        self.record(key)
    }

    fn get(&mut self, key: &K) -> Result<(), SeparatorError> {
        self.record(key)
    }

    fn is_hot_key(&self, key: &K) -> bool {
        self.window.contains(key) && self.sketch.estimate(key) >= self.threshold
    }

    /// Window order, most recent first.
    fn hot_keys(&self) -> Vec<K> {
        self.window
            .iter()
            .filter(|key| self.sketch.estimate(*key) >= self.threshold)
            .cloned()
            .collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "sketch_window width={} depth={} threshold={} window={}/{}{}",
            self.sketch.width(),
            self.sketch.depth(),
            self.threshold,
            self.window.len(),
            self.window_size,
            if self.enable_lru { "" } else { " (unbounded)" }
        )?;
        for key in self.window.iter() {
            writeln!(out, "  {key:?}: ~{}", self.sketch.estimate(key))?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::SketchWindow
    }

    fn len(&self) -> usize {
        self.window.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.enable_lru.then_some(self.window_size)
    }
}
