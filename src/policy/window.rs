//! Time-window heat separator.
//!
//! Counts accesses per key over a sliding window of `window_ms`
//! milliseconds. A key is hot while it has at least `threshold` accesses
//! inside the window.
//!
//! ```text
//!   accesses (oldest ─► newest)        counts
//!   ┌────────┬────────┬────────┐       { x: 2, y: 1 }
//!   │ t=0 x  │ t=1 x  │ t=4 y  │
//!   └────────┴────────┴────────┘
//!        ▲ expired once now - t > window_ms
//! ```
//!
//! Expiry happens eagerly at the start of every access. Queries take `&self`
//! and discount the still-queued entries that have aged out since the last
//! access, so a quiet separator stops reporting stale keys without being
//! mutated. Memory is bounded by the number of accesses inside one window.
use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::SeparatorKind;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

#[derive(Debug)]
pub struct WindowSeparator<K> {
    window_ms: u64,
    threshold: u64,
    accesses: VecDeque<(u64, K)>,
    counts: FxHashMap<K, u64>,
    clock: Arc<dyn Clock>,
}

impl<K> WindowSeparator<K>
where
    K: Clone + Eq + Hash,
{
    /// Window backed by the process monotonic clock.
    pub fn try_new(window_ms: u64, threshold: u64) -> Result<Self, ConfigError> {
        Self::try_with_clock(window_ms, threshold, Arc::new(MonotonicClock::new()))
    }

    pub fn try_with_clock(
        window_ms: u64,
        threshold: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::new("threshold must be at least 1"));
        }
        Ok(Self {
            window_ms,
            threshold,
            accesses: VecDeque::new(),
            counts: FxHashMap::default(),
            clock,
        })
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Accesses currently queued, expired-but-undrained ones included.
    pub fn queued_accesses(&self) -> usize {
        self.accesses.len()
    }

    /// Access count for `key` inside the window as of now.
    pub fn count_in_window(&self, key: &K) -> u64 {
        let now = self.clock.now_ms();
        let stale = self
            .expired_prefix(now)
            .filter(|(_, k)| k == key)
            .count() as u64;
        self.counts
            .get(key)
            .map_or(0, |count| count.saturating_sub(stale))
    }

    fn is_expired(&self, now: u64, ts: u64) -> bool {
        now.saturating_sub(ts) > self.window_ms
    }

    fn expired_prefix(&self, now: u64) -> impl Iterator<Item = &(u64, K)> {
        self.accesses
            .iter()
            .take_while(move |(ts, _)| self.is_expired(now, *ts))
    }

    fn expire(&mut self, now: u64) {
        while let Some((ts, _)) = self.accesses.front() {
            if !self.is_expired(now, *ts) {
                break;
            }
            let Some((_, key)) = self.accesses.pop_front() else {
                break;
            };
            if let Some(count) = self.counts.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&key);
                }
            }
        }
    }

    fn record(&mut self, key: &K) {
        let now = self.clock.now_ms();
        self.expire(now);
        self.accesses.push_back((now, key.clone()));
        *self.counts.entry(key.clone()).or_insert(0) += 1;
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let total: u64 = self.counts.values().sum();
        if total != self.accesses.len() as u64 {
            return Err(InvariantError::new(format!(
                "window counts sum to {} but {} accesses are queued",
                total,
                self.accesses.len()
            )));
        }
        if self.counts.values().any(|count| *count == 0) {
            return Err(InvariantError::new("window keeps a zero count"));
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for WindowSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        self.record(key);
        Ok(())
    }

    fn get(&mut self, key: &K) -> Result<(), SeparatorError> {
        self.record(key);
        Ok(())
    }

    fn is_hot_key(&self, key: &K) -> bool {
        self.count_in_window(key) >= self.threshold
    }

    /// Most recently accessed first.
    fn hot_keys(&self) -> Vec<K> {
        let now = self.clock.now_ms();
        let mut stale: FxHashMap<&K, u64> = FxHashMap::default();
        for (_, key) in self.expired_prefix(now) {
            *stale.entry(key).or_insert(0) += 1;
        }

        let mut seen: FxHashSet<&K> = FxHashSet::default();
        let mut hot = Vec::new();
        for (ts, key) in self.accesses.iter().rev() {
            if self.is_expired(now, *ts) {
                break;
            }
            if !seen.insert(key) {
                continue;
            }
            let count = self.counts.get(key).copied().unwrap_or(0);
            let live = count.saturating_sub(stale.get(key).copied().unwrap_or(0));
            if live >= self.threshold {
                hot.push(key.clone());
            }
        }
        hot
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "window window_ms={} threshold={} queued={} keys={}",
            self.window_ms,
            self.threshold,
            self.accesses.len(),
            self.counts.len()
        )?;
        for (key, count) in &self.counts {
            writeln!(out, "  {key:?}: {count}")?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::Window
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn capacity(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn window(window_ms: u64, threshold: u64) -> (WindowSeparator<&'static str>, ManualClock) {
        let clock = ManualClock::new(0);
        let sep = WindowSeparator::try_with_clock(window_ms, threshold, Arc::new(clock.clone()))
            .unwrap();
        (sep, clock)
    }

    mod basic_behavior {
        use super::*;

        #[test]
        fn test_threshold_reached_within_window() {
            let (mut sep, clock) = window(5, 2);
            sep.put(&"x").unwrap();
            clock.set(1);
            sep.put(&"x").unwrap();
            assert!(sep.is_hot_key(&"x"));
            assert_eq!(sep.hot_keys(), vec!["x"]);

            clock.set(7);
            sep.put(&"y").unwrap();
            assert!(!sep.is_hot_key(&"x"));
            assert!(sep.hot_keys().is_empty());
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_idle_period_cools_key() {
            let (mut sep, clock) = window(5, 2);
            sep.put(&"k").unwrap();
            clock.set(3);
            sep.put(&"k").unwrap();
            assert!(sep.is_hot_key(&"k"));

            clock.set(10);
            assert!(!sep.is_hot_key(&"k"));
        }

        #[test]
        fn test_boundary_access_still_counts() {
            let (mut sep, clock) = window(5, 1);
            sep.put(&"a").unwrap();
            clock.set(5);
            assert!(sep.is_hot_key(&"a"));
            clock.set(6);
            assert!(!sep.is_hot_key(&"a"));
        }

        #[test]
        fn test_hot_keys_most_recent_first() {
            let (mut sep, clock) = window(100, 1);
            sep.put(&"a").unwrap();
            clock.advance(1);
            sep.get(&"b").unwrap();
            clock.advance(1);
            sep.put(&"a").unwrap();
            assert_eq!(sep.hot_keys(), vec!["a", "b"]);
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_queries_discount_expired_without_mutation() {
            let (mut sep, clock) = window(5, 2);
            sep.put(&"x").unwrap();
            sep.put(&"x").unwrap();
            clock.set(3);
            sep.put(&"x").unwrap();

            clock.set(6);
            assert_eq!(sep.count_in_window(&"x"), 1);
            assert!(!sep.is_hot_key(&"x"));
            assert_eq!(sep.queued_accesses(), 3);
        }

        #[test]
        fn test_threshold_one_single_access_expires() {
            let (mut sep, clock) = window(10, 1);
            sep.put(&"k").unwrap();
            assert!(sep.is_hot_key(&"k"));
            clock.set(11);
            sep.put(&"other").unwrap();
            assert!(!sep.is_hot_key(&"k"));
            assert_eq!(sep.len(), 1);
        }

        #[test]
        fn test_zero_threshold_rejected() {
            let clock = Arc::new(ManualClock::new(0));
            assert!(WindowSeparator::<u32>::try_with_clock(5, 0, clock).is_err());
        }

        #[test]
        fn test_unbounded_capacity() {
            let (sep, _) = window(5, 1);
            assert_eq!(sep.capacity(), None);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_counts_match_queue(
                window_ms in 0u64..20,
                ops in prop::collection::vec((0u64..5, 0u8..10), 0..200)
            ) {
                let clock = ManualClock::new(0);
                let mut sep =
                    WindowSeparator::try_with_clock(window_ms, 1, Arc::new(clock.clone())).unwrap();
                for (step, key) in ops {
                    clock.advance(step);
                    sep.put(&key).unwrap();
                    prop_assert!(sep.is_hot_key(&key));
                    prop_assert!(sep.check_invariants().is_ok());
                }
            }
        }
    }
}
