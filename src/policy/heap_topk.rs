//! Top-K heat separator over exact access counts.
//!
//! Every access increments an exact per-key counter. Keys whose count has
//! reached `threshold` compete for `k` slots in a min-heap keyed by count;
//! a newcomer displaces the heap minimum only with a strictly higher count.
//!
//! ```text
//!   counts: { a: 9, b: 4, c: 6, d: 2 }        k = 2, threshold = 3
//!   heap (min at top):  (c, 6) (a, 9)          hot = { a, c }
//!
//!   access(b) x3 -> b: 7 > 6 -> c displaced -> heap: (b, 7) (a, 9)
//! ```
//!
//! Member counts are updated in place through [`LazyMinHeap`], so a hit on a
//! member costs one heap push instead of a full rebuild. The counter table is
//! unbounded; this policy is reachable through the builder but not through
//! the configuration file.
use std::fmt::{self, Debug};
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::builder::SeparatorKind;
use crate::ds::LazyMinHeap;
use crate::error::{InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

/// Stale heap entries tolerated per live member before compaction.
const REBUILD_FACTOR: usize = 4;

#[derive(Debug)]
pub struct HeapTopKSeparator<K> {
    counts: FxHashMap<K, u64>,
    members: LazyMinHeap<K, u64>,
    k: usize,
    threshold: u64,
}

impl<K> HeapTopKSeparator<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(k: usize, threshold: u64) -> Self {
        Self {
            counts: FxHashMap::default(),
            members: LazyMinHeap::with_capacity(k),
            k,
            threshold,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Exact access count for `key`.
    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys ever counted.
    pub fn tracked_keys(&self) -> usize {
        self.counts.len()
    }

    fn record(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.k == 0 {
            return Err(SeparatorError::Capacity);
        }
        let count = {
            let slot = self.counts.entry(key.clone()).or_insert(0);
            *slot += 1;
            *slot
        };
        if count < self.threshold {
            return Ok(());
        }

        if self.members.contains(key) {
            self.members.update(key.clone(), count);
            self.members.maybe_rebuild(REBUILD_FACTOR);
            return Ok(());
        }

        if self.members.len() < self.k {
            self.members.update(key.clone(), count);
            return Ok(());
        }

        let displaces = self
            .members
            .peek_best()
            .is_some_and(|(_, &lowest)| count > lowest);
        if displaces {
            self.members.pop_best();
            self.members.update(key.clone(), count);
        }
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.members.len() > self.k {
            return Err(InvariantError::new(format!(
                "top-k holds {} members for k = {}",
                self.members.len(),
                self.k
            )));
        }
        for (key, score) in self.members.iter() {
            let count = self.counts.get(key).copied().unwrap_or(0);
            if *score != count || count < self.threshold {
                return Err(InvariantError::new(format!(
                    "member score {score} disagrees with count {count}"
                )));
            }
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for HeapTopKSeparator<K>
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
        self.members.contains(key)
    }

    /// Highest count first.
    fn hot_keys(&self) -> Vec<K> {
        let mut ranked: Vec<(&K, u64)> = self
            .members
            .iter()
            .map(|(key, score)| (key, *score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(key, _)| key.clone()).collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "heap_topk k={} threshold={} members={} tracked={}",
            self.k,
            self.threshold,
            self.members.len(),
            self.counts.len()
        )?;
        for key in self.hot_keys() {
            writeln!(out, "  {key:?}: {}", self.count(&key))?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::HeapTopK
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod basic_behavior {
        use super::*;

        fn hit(sep: &mut HeapTopKSeparator<&'static str>, key: &'static str, times: usize) {
            for _ in 0..times {
                sep.put(&key).unwrap();
            }
        }

        #[test]
        fn test_threshold_gates_membership() {
            let mut sep = HeapTopKSeparator::new(2, 3);
            hit(&mut sep, "a", 2);
            assert!(!sep.is_hot_key(&"a"));
            sep.get(&"a").unwrap();
            assert!(sep.is_hot_key(&"a"));
        }

        #[test]
        fn test_higher_count_displaces_minimum() {
            let mut sep = HeapTopKSeparator::new(2, 3);
            hit(&mut sep, "a", 9);
            hit(&mut sep, "c", 6);
            hit(&mut sep, "b", 6);
            assert!(!sep.is_hot_key(&"b"));

            sep.put(&"b").unwrap();
            assert!(sep.is_hot_key(&"b"));
            assert!(!sep.is_hot_key(&"c"));
            assert_eq!(sep.hot_keys(), vec!["a", "b"]);
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_member_hits_update_score() {
            let mut sep = HeapTopKSeparator::new(2, 1);
            hit(&mut sep, "a", 1);
            hit(&mut sep, "b", 2);
            hit(&mut sep, "a", 5);
            assert_eq!(sep.hot_keys(), vec!["a", "b"]);

            hit(&mut sep, "c", 3);
            assert!(sep.is_hot_key(&"c"));
            assert!(!sep.is_hot_key(&"b"));
            sep.check_invariants().unwrap();
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_zero_k_rejects_access() {
            let mut sep: HeapTopKSeparator<u32> = HeapTopKSeparator::new(0, 1);
            assert_eq!(sep.put(&1), Err(SeparatorError::Capacity));
            assert_eq!(sep.get(&1), Err(SeparatorError::Capacity));
        }

        #[test]
        fn test_counts_survive_displacement() {
            let mut sep = HeapTopKSeparator::new(1, 1);
            sep.put(&1u32).unwrap();
            sep.put(&1u32).unwrap();
            sep.put(&2u32).unwrap();
            assert_eq!(sep.count(&2), 1);
            assert_eq!(sep.tracked_keys(), 2);
            assert_eq!(sep.hot_keys(), vec![1]);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_members_bounded_and_exact(
                k in 1usize..8,
                threshold in 1u64..4,
                keys in prop::collection::vec(0u8..30, 0..300)
            ) {
                let mut sep = HeapTopKSeparator::new(k, threshold);
                for key in keys {
                    sep.put(&key).unwrap();
                    prop_assert!(sep.len() <= k);
                    prop_assert!(sep.check_invariants().is_ok());
                }
            }
        }
    }
}
