//! W-TinyLFU heat separator.
//!
//! A small LRU admission window sits in front of a segmented LRU main area.
//! Keys leaving the window have to win a frequency contest against the main
//! area's eviction victim before they are admitted, which keeps one-hit
//! scans from flushing established hot keys.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────┐  overflow   ┌──────────────────── main ─────────────────────┐
//!   new key ────► │  window  │ ──────────► │ probation (LRU) ◄──── demote ──── protected   │
//!                 │   (1%)   │  candidate  │        │                          (80% of main)│
//!                 └──────────┘             │        └──── hit: promote ────────────►        │
//!                                          └───────────────────────────────────────────────┘
//!
//!   admission(candidate):
//!     main has room                    -> admit to probation
//!     doorkeeper has not seen it       -> remember it, drop
//!     freq(candidate) >= freq(victim)  -> evict victim, admit
//!     otherwise                        -> drop
//! ```
//!
//! Frequencies come from a 4-bit [`FrequencySketch`]. Every `sample_size`
//! accesses the sketch is halved and the [`BloomFilter`] doorkeeper is
//! cleared, so popularity ages out.
//!
//! Hot keys are the main-area residents: protected first, then probation,
//! each most recent first.
use std::fmt::{self, Debug};
use std::hash::Hash;

use crate::builder::SeparatorKind;
use crate::ds::{BloomFilter, FrequencySketch, RecencyList};
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

pub const DEFAULT_WINDOW_RATIO: f64 = 0.01;
pub const DEFAULT_PROTECTED_RATIO: f64 = 0.8;
const DOORKEEPER_FALSE_POSITIVE_RATE: f64 = 0.01;
const DEFAULT_SAMPLE_MULTIPLIER: u64 = 10;

/// Tuning knobs for [`WTinyLfuSeparator`].
#[derive(Debug, Clone, PartialEq)]
pub struct WTinyLfuParams {
    /// Share of the capacity given to the admission window.
    pub window_ratio: f64,
    /// Share of the main area reserved for protected keys.
    pub protected_ratio: f64,
    /// Accesses between agings; `None` means ten times the capacity.
    pub sample_size: Option<u64>,
    /// Seed for the sketch row hashes.
    pub seed: u64,
}

impl Default for WTinyLfuParams {
    fn default() -> Self {
        Self {
            window_ratio: DEFAULT_WINDOW_RATIO,
            protected_ratio: DEFAULT_PROTECTED_RATIO,
            sample_size: None,
            seed: 0,
        }
    }
}

#[derive(Debug)]
pub struct WTinyLfuSeparator<K> {
    window: RecencyList<K>,
    probation: RecencyList<K>,
    protected: RecencyList<K>,
    window_cap: usize,
    main_cap: usize,
    protected_cap: usize,
    capacity: usize,
    sketch: FrequencySketch,
    doorkeeper: BloomFilter,
    sample_size: u64,
    accesses: u64,
    agings: u64,
}

impl<K> WTinyLfuSeparator<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        match Self::try_with_params(capacity, WTinyLfuParams::default()) {
            Ok(sep) => sep,
            Err(e) => panic!("{}", e),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if a ratio is outside `[0, 1]` or
    /// `sample_size` is zero.
    pub fn try_with_params(capacity: usize, params: WTinyLfuParams) -> Result<Self, ConfigError> {
        for (name, ratio) in [
            ("window_ratio", params.window_ratio),
            ("protected_ratio", params.protected_ratio),
        ] {
            if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::new(format!(
                    "{name} must be in [0.0, 1.0], got {ratio}"
                )));
            }
        }
        if params.sample_size == Some(0) {
            return Err(ConfigError::new("sample_size must be at least 1"));
        }

        let window_cap = if capacity == 0 {
            0
        } else {
            ((capacity as f64 * params.window_ratio).ceil() as usize).clamp(1, capacity)
        };
        let main_cap = capacity - window_cap;
        let protected_cap = (main_cap as f64 * params.protected_ratio).floor() as usize;
        let sample_size = params
            .sample_size
            .unwrap_or_else(|| (capacity as u64).saturating_mul(DEFAULT_SAMPLE_MULTIPLIER))
            .max(1);

        tracing::debug!(
            capacity,
            window_cap,
            main_cap,
            protected_cap,
            sample_size,
            "w_tinylfu sized"
        );

        Ok(Self {
            window: RecencyList::with_capacity(window_cap + 1),
            probation: RecencyList::with_capacity(main_cap - protected_cap),
            protected: RecencyList::with_capacity(protected_cap),
            window_cap,
            main_cap,
            protected_cap,
            capacity,
            sketch: FrequencySketch::new(capacity, params.seed),
            doorkeeper: BloomFilter::new(capacity, DOORKEEPER_FALSE_POSITIVE_RATE),
            sample_size,
            accesses: 0,
            agings: 0,
        })
    }

    /// `(window, probation, protected)` resident counts.
    pub fn segment_lens(&self) -> (usize, usize, usize) {
        (self.window.len(), self.probation.len(), self.protected.len())
    }

    /// `(window, main, protected)` capacities.
    pub fn segment_caps(&self) -> (usize, usize, usize) {
        (self.window_cap, self.main_cap, self.protected_cap)
    }

    pub fn frequency(&self, key: &K) -> u8 {
        self.sketch.frequency(key)
    }

    /// Number of times the sketch has been halved.
    pub fn agings(&self) -> u64 {
        self.agings
    }

    fn record(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.capacity == 0 {
            return Err(SeparatorError::Capacity);
        }

        self.accesses += 1;
        if self.accesses >= self.sample_size {
            self.sketch.halve();
            self.doorkeeper.clear();
            self.accesses = 0;
            self.agings += 1;
            tracing::debug!(agings = self.agings, "w_tinylfu sketch aged");
        }
        self.sketch.increment(key);

        if self.window.touch(key) || self.protected.touch(key) {
            return Ok(());
        }
        if self.probation.remove(key) {
            self.promote(key.clone());
            return Ok(());
        }

        self.window.push_front(key.clone());
        if self.window.len() > self.window_cap
            && let Some(candidate) = self.window.pop_back()
        {
            self.admit(candidate);
        }
        Ok(())
    }

    fn promote(&mut self, key: K) {
        if self.protected_cap == 0 {
            self.probation.push_front(key);
            return;
        }
        if self.protected.len() >= self.protected_cap
            && let Some(demoted) = self.protected.pop_back()
        {
            self.probation.push_front(demoted);
        }
        self.protected.push_front(key);
    }

    fn admit(&mut self, candidate: K) {
        if self.probation.len() + self.protected.len() < self.main_cap {
            self.probation.push_front(candidate);
            return;
        }
        let victim = match self.probation.back().or_else(|| self.protected.back()) {
            Some(victim) => victim.clone(),
            None => return,
        };
        if !self.doorkeeper.allow(&candidate) {
            return;
        }
        if self.sketch.frequency(&candidate) >= self.sketch.frequency(&victim) {
            if !self.probation.remove(&victim) {
                self.protected.remove(&victim);
            }
            self.probation.push_front(candidate);
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for segment in [&self.window, &self.probation, &self.protected] {
            segment.check_invariants()?;
        }
        if self.window.len() > self.window_cap {
            return Err(InvariantError::new(format!(
                "window holds {} keys with capacity {}",
                self.window.len(),
                self.window_cap
            )));
        }
        if self.protected.len() > self.protected_cap {
            return Err(InvariantError::new(format!(
                "protected holds {} keys with capacity {}",
                self.protected.len(),
                self.protected_cap
            )));
        }
        if self.probation.len() + self.protected.len() > self.main_cap {
            return Err(InvariantError::new(format!(
                "main holds {} keys with capacity {}",
                self.probation.len() + self.protected.len(),
                self.main_cap
            )));
        }
        let overlap = self
            .window
            .iter()
            .chain(self.probation.iter())
            .filter(|key| self.protected.contains(key))
            .count()
            + self
                .window
                .iter()
                .filter(|key| self.probation.contains(key))
                .count();
        if overlap != 0 {
            return Err(InvariantError::new(format!(
                "{overlap} keys are resident in two segments"
            )));
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for WTinyLfuSeparator<K>
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
        self.protected.contains(key) || self.probation.contains(key)
    }

    fn hot_keys(&self) -> Vec<K> {
        self.protected
            .iter()
            .chain(self.probation.iter())
            .cloned()
            .collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "w_tinylfu capacity={} window={}/{} probation={} protected={}/{} agings={}",
            self.capacity,
            self.window.len(),
            self.window_cap,
            self.probation.len(),
            self.protected.len(),
            self.protected_cap,
            self.agings
        )?;
        for (label, segment) in [
            ("window", &self.window),
            ("probation", &self.probation),
            ("protected", &self.protected),
        ] {
            write!(out, "  {label}:")?;
            for key in segment.iter() {
                write!(out, " {key:?}~{}", self.sketch.frequency(key))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::WTinyLfu
    }

    fn len(&self) -> usize {
        self.window.len() + self.probation.len() + self.protected.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}
