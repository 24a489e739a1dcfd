//! LRU heat separator.
//!
//! Keeps the `capacity` most recently accessed keys. Every resident key is
//! hot; the report lists them most recent first.
//!
//! ```text
//!   put(c) with capacity 2:
//!     before: head ─► [b] ◄──► [a] ◄── tail
//!     evict a (LRU), insert c at MRU
//!     after:  head ─► [c] ◄──► [b] ◄── tail
//! ```
//!
//! `get` never admits: an unseen key returns
//! [`SeparatorError::NotFound`] and leaves the list untouched.
use std::fmt::{self, Debug};
use std::hash::Hash;

use crate::builder::SeparatorKind;
use crate::ds::RecencyList;
use crate::error::{InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

#[derive(Debug)]
pub struct LruSeparator<K> {
    list: RecencyList<K>,
    capacity: usize,
}

impl<K> LruSeparator<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            list: RecencyList::with_capacity(capacity),
            capacity,
        }
    }

    /// Least recently used resident key, next in line for eviction.
    pub fn peek_lru(&self) -> Option<&K> {
        self.list.back()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.list.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "LRU holds {} keys with capacity {}",
                self.list.len(),
                self.capacity
            )));
        }
        self.list.check_invariants()
    }
}

impl<K> HeatSeparator<K> for LruSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.capacity == 0 {
            return Err(SeparatorError::Capacity);
        }
        if self.list.touch(key) {
            return Ok(());
        }
        if self.list.len() >= self.capacity {
            self.list.pop_back();
        }
        self.list.push_front(key.clone());
        Ok(())
    }

    fn get(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.list.touch(key) {
            Ok(())
        } else {
            Err(SeparatorError::NotFound)
        }
    }

    fn is_hot_key(&self, key: &K) -> bool {
        self.list.contains(key)
    }

    fn hot_keys(&self) -> Vec<K> {
        self.list.iter().cloned().collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "lru capacity={} len={}", self.capacity, self.list.len())?;
        for key in self.list.iter() {
            writeln!(out, "  {key:?}")?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::Lru
    }

    fn len(&self) -> usize {
        self.list.len()
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
        fn test_capacity_two_evicts_oldest() {
            let mut lru = LruSeparator::new(2);
            lru.put(&"a").unwrap();
            lru.put(&"b").unwrap();
            lru.put(&"c").unwrap();

            assert_eq!(lru.hot_keys(), vec!["c", "b"]);
            assert!(!lru.is_hot_key(&"a"));

            lru.get(&"b").unwrap();
            assert_eq!(lru.hot_keys(), vec!["b", "c"]);
        }

        #[test]
        fn test_put_existing_refreshes_without_eviction() {
            let mut lru = LruSeparator::new(2);
            lru.put(&1).unwrap();
            lru.put(&2).unwrap();
            lru.put(&1).unwrap();
            lru.put(&3).unwrap();
            assert_eq!(lru.hot_keys(), vec![3, 1]);
        }

        #[test]
        fn test_repeated_get_keeps_key_mru() {
            let mut lru = LruSeparator::new(3);
            for k in [1, 2, 3] {
                lru.put(&k).unwrap();
            }
            for _ in 0..3 {
                lru.get(&1).unwrap();
                assert_eq!(lru.hot_keys()[0], 1);
            }
            assert_eq!(lru.peek_lru(), Some(&2));
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_get_missing_is_not_found() {
            let mut lru: LruSeparator<u32> = LruSeparator::new(2);
            assert_eq!(lru.get(&9), Err(SeparatorError::NotFound));
            assert!(lru.is_empty());
        }

        #[test]
        fn test_zero_capacity_rejects_put() {
            let mut lru: LruSeparator<u32> = LruSeparator::new(0);
            assert_eq!(lru.put(&1), Err(SeparatorError::Capacity));
            assert!(lru.hot_keys().is_empty());
        }

        #[test]
        fn test_diagnostics_lists_keys() {
            let mut lru = LruSeparator::new(2);
            lru.put(&"x").unwrap();
            let mut dump = String::new();
            lru.write_diagnostics(&mut dump).unwrap();
            assert!(dump.starts_with("lru capacity=2 len=1"));
            assert!(dump.contains("\"x\""));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_never_exceeds_capacity(
                capacity in 1usize..16,
                ops in prop::collection::vec((any::<bool>(), 0u16..64), 0..300)
            ) {
                let mut lru = LruSeparator::new(capacity);
                for (is_put, key) in ops {
                    if is_put {
                        lru.put(&key).unwrap();
                        prop_assert_eq!(lru.hot_keys()[0], key);
                    } else {
                        let _ = lru.get(&key);
                    }
                    prop_assert!(lru.len() <= capacity);
                    prop_assert!(lru.check_invariants().is_ok());
                }
            }
        }
    }
}
