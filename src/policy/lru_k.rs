//! LRU-K heat separator.
//!
//! A key has to be accessed `k` times before it counts as hot. Keys with
//! fewer accesses wait in a FIFO history queue; the `k`-th access promotes
//! the key to the front of the cache queue, and later accesses keep it at
//! the front.
//!
//! ## Architecture
//!
//! ```text
//!   entries: FxHashMap<K, Entry { count, queue, id }>
//!
//!   history (count < k, FIFO):  head ─► [new] ... [old] ◄── evicted first
//!   cache   (count >= k, LRU):  head ─► [mru] ... [lru] ◄── evicted when history is empty
//! ```
//!
//! Both queues share one capacity. With `k == 1` new keys skip the history
//! queue and land in the cache queue directly. `k == 0` is rejected at
//! construction.
use std::fmt::{self, Debug};
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::builder::SeparatorKind;
use crate::ds::{IntrusiveList, SlotId};
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queue {
    History,
    Cache,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u64,
    queue: Queue,
    id: SlotId,
}

#[derive(Debug)]
pub struct LruKSeparator<K> {
    entries: FxHashMap<K, Entry>,
    history: IntrusiveList<K>,
    cache: IntrusiveList<K>,
    k: u64,
    capacity: usize,
}

impl<K> LruKSeparator<K>
where
    K: Clone + Eq + Hash,
{
    /// # Panics
    ///
    /// Panics if `k` is zero. See [`try_new`](Self::try_new).
    pub fn new(k: u64, capacity: usize) -> Self {
        match Self::try_new(k, capacity) {
            Ok(sep) => sep,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(k: u64, capacity: usize) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::new("k must be at least 1"));
        }
        Ok(Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            history: IntrusiveList::with_capacity(capacity),
            cache: IntrusiveList::with_capacity(capacity),
            k,
            capacity,
        })
    }

    pub fn k(&self) -> u64 {
        self.k
    }

    pub fn access_count(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.count)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn touch(&mut self, key: &K) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.count += 1;
        match entry.queue {
            Queue::History if entry.count >= self.k => {
                if let Some(owned) = self.history.remove(entry.id) {
                    entry.id = self.cache.push_front(owned);
                    entry.queue = Queue::Cache;
                }
            }
            Queue::History => {}
            Queue::Cache => {
                self.cache.move_to_front(entry.id);
            }
        }
        true
    }

    fn evict_one(&mut self) {
        let victim = match self.history.pop_back() {
            Some(key) => Some(key),
            None => self.cache.pop_back(),
        };
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.history.check_links()?;
        self.cache.check_links()?;
        if self.history.len() + self.cache.len() != self.entries.len() {
            return Err(InvariantError::new(format!(
                "LRU-K queues hold {} + {} keys but index holds {}",
                self.history.len(),
                self.cache.len(),
                self.entries.len()
            )));
        }
        if self.entries.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "LRU-K holds {} keys with capacity {}",
                self.entries.len(),
                self.capacity
            )));
        }
        for entry in self.entries.values() {
            let (list, promoted) = match entry.queue {
                Queue::History => (&self.history, false),
                Queue::Cache => (&self.cache, true),
            };
            if !list.contains(entry.id) || promoted != (entry.count >= self.k) {
                return Err(InvariantError::new(format!(
                    "LRU-K entry with count {} misplaced in {:?}",
                    entry.count, entry.queue
                )));
            }
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for LruKSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.capacity == 0 {
            return Err(SeparatorError::Capacity);
        }
        if self.touch(key) {
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            self.evict_one();
        }
        let entry = if self.k == 1 {
            Entry {
                count: 1,
                queue: Queue::Cache,
                id: self.cache.push_front(key.clone()),
            }
        } else {
            Entry {
                count: 1,
                queue: Queue::History,
                id: self.history.push_front(key.clone()),
            }
        };
        self.entries.insert(key.clone(), entry);
        Ok(())
    }

    fn get(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.touch(key) {
            Ok(())
        } else {
            Err(SeparatorError::NotFound)
        }
    }

    fn is_hot_key(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.queue == Queue::Cache)
    }

    fn hot_keys(&self) -> Vec<K> {
        self.cache.iter().cloned().collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "lruk k={} capacity={} history={} cache={}",
            self.k,
            self.capacity,
            self.history.len(),
            self.cache.len()
        )?;
        for (label, list) in [("history", &self.history), ("cache", &self.cache)] {
            write!(out, "  {label}:")?;
            for key in list.iter() {
                let count = self.entries.get(key).map_or(0, |entry| entry.count);
                write!(out, " {key:?}x{count}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::LruK
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod basic_behavior {
        use super::*;

        #[test]
        fn test_k_minus_one_accesses_stay_cold() {
            let mut sep = LruKSeparator::new(3, 10);
            sep.put(&"a").unwrap();
            sep.get(&"a").unwrap();
            assert!(!sep.is_hot_key(&"a"));
            assert_eq!(sep.access_count(&"a"), Some(2));

            sep.get(&"a").unwrap();
            assert!(sep.is_hot_key(&"a"));
            assert_eq!(sep.hot_keys(), vec!["a"]);
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_cache_queue_is_mru_first() {
            let mut sep = LruKSeparator::new(2, 10);
            for key in ["a", "b"] {
                sep.put(&key).unwrap();
                sep.put(&key).unwrap();
            }
            assert_eq!(sep.hot_keys(), vec!["b", "a"]);
            sep.get(&"a").unwrap();
            assert_eq!(sep.hot_keys(), vec!["a", "b"]);
        }

        #[test]
        fn test_history_evicted_before_cache() {
            let mut sep = LruKSeparator::new(2, 3);
            sep.put(&1).unwrap();
            sep.put(&1).unwrap();
            sep.put(&2).unwrap();
            sep.put(&3).unwrap();
            sep.put(&4).unwrap();

            assert!(sep.is_hot_key(&1));
            assert_eq!(sep.access_count(&2), None);
            assert_eq!(sep.history_len(), 2);
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_cache_tail_evicted_when_history_empty() {
            let mut sep = LruKSeparator::new(1, 2);
            sep.put(&1).unwrap();
            sep.put(&2).unwrap();
            sep.put(&3).unwrap();
            assert_eq!(sep.hot_keys(), vec![3, 2]);
            assert_eq!(sep.cache_len(), 2);
            assert_eq!(sep.history_len(), 0);
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_k_one_is_hot_immediately() {
            let mut sep = LruKSeparator::new(1, 4);
            sep.put(&"x").unwrap();
            assert!(sep.is_hot_key(&"x"));
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_k_zero_rejected() {
            assert!(LruKSeparator::<u32>::try_new(0, 4).is_err());
        }

        #[test]
        fn test_get_missing_is_not_found() {
            let mut sep: LruKSeparator<u32> = LruKSeparator::new(2, 4);
            assert_eq!(sep.get(&7), Err(SeparatorError::NotFound));
        }

        #[test]
        fn test_zero_capacity_rejects_put() {
            let mut sep: LruKSeparator<u32> = LruKSeparator::new(2, 0);
            assert_eq!(sep.put(&7), Err(SeparatorError::Capacity));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_queues_consistent(
                k in 1u64..4,
                capacity in 1usize..12,
                ops in prop::collection::vec((any::<bool>(), 0u8..30), 0..300)
            ) {
                let mut sep = LruKSeparator::new(k, capacity);
                for (is_put, key) in ops {
                    if is_put {
                        sep.put(&key).unwrap();
                    } else {
                        let _ = sep.get(&key);
                    }
                    prop_assert!(sep.len() <= capacity);
                    prop_assert!(sep.check_invariants().is_ok());
                }
            }
        }
    }
}
