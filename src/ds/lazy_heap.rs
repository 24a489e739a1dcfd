//! Lazy min-heap with stale entry skipping.
//!
//! Updates never touch existing heap entries. The authoritative score lives
//! in a map; every update pushes a fresh `(score, seq, key)` entry and older
//! entries for the same key become stale. [`pop_best`](LazyMinHeap::pop_best)
//! and [`peek_best`](LazyMinHeap::peek_best) discard stale entries as they
//! surface, which turns the Top-K separator's "rebuild on every update" into
//! an O(log n) push.
//!
//! ```text
//!   scores: { A: 10, B: 3 }
//!   heap:   (B,3,seq5) (A,10,seq3) (A,15,seq1 stale)
//! ```
//!
//! Ties on equal scores are broken by insertion sequence (oldest first).
//! When `heap_len()` grows well beyond `len()`, [`maybe_rebuild`] compacts.
//!
//! [`maybe_rebuild`]: LazyMinHeap::maybe_rebuild
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct HeapEntry<K, S> {
    score: S,
    seq: u64,
    key: K,
}

impl<K, S: Ord> PartialEq for HeapEntry<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl<K, S: Ord> Eq for HeapEntry<K, S> {}

impl<K, S: Ord> PartialOrd for HeapEntry<K, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, S: Ord> Ord for HeapEntry<K, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.score.cmp(&other.score) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ordering => ordering,
        }
    }
}

/// Min-heap with O(log n) score updates via lazy deletion.
#[derive(Debug)]
pub struct LazyMinHeap<K, S> {
    scores: FxHashMap<K, S>,
    heap: BinaryHeap<Reverse<HeapEntry<K, S>>>,
    seq: u64,
}

impl<K, S> LazyMinHeap<K, S>
where
    K: Eq + Hash + Clone,
    S: Ord + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Number of heap entries, stale ones included.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.scores.contains_key(key)
    }

    pub fn score_of(&self, key: &K) -> Option<&S> {
        self.scores.get(key)
    }

    /// Sets the score for `key`, returning the previous score.
    pub fn update(&mut self, key: K, score: S) -> Option<S> {
        let previous = self.scores.insert(key.clone(), score.clone());
        self.push_entry(key, score);
        previous
    }

    /// Removes `key`; its heap entries become stale.
    pub fn remove(&mut self, key: &K) -> Option<S> {
        self.scores.remove(key)
    }

    /// Returns the live minimum without removing it, discarding stale tops.
    pub fn peek_best(&mut self) -> Option<(&K, &S)> {
        loop {
            let live = {
                let Reverse(entry) = self.heap.peek()?;
                self.scores
                    .get(&entry.key)
                    .is_some_and(|score| *score == entry.score)
            };
            if live {
                break;
            }
            self.heap.pop();
        }
        self.heap
            .peek()
            .map(|Reverse(entry)| (&entry.key, &entry.score))
    }

    /// Removes and returns the live minimum.
    pub fn pop_best(&mut self) -> Option<(K, S)> {
        loop {
            let Reverse(entry) = self.heap.pop()?;
            match self.scores.get(&entry.key) {
                Some(score) if *score == entry.score => {
                    self.scores.remove(&entry.key);
                    return Some((entry.key, entry.score));
                }
                _ => continue,
            }
        }
    }

    /// Iterates live `(key, score)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &S)> {
        self.scores.iter()
    }

    pub fn rebuild(&mut self) {
        self.heap.clear();
        let entries: Vec<(K, S)> = self
            .scores
            .iter()
            .map(|(key, score)| (key.clone(), score.clone()))
            .collect();
        for (key, score) in entries {
            self.push_entry(key, score);
        }
    }

    /// Rebuilds when stale entries outnumber live ones by `factor`.
    pub fn maybe_rebuild(&mut self, factor: usize) {
        let live = self.scores.len().max(1);
        if self.heap.len() > live.saturating_mul(factor.max(1)) {
            self.rebuild();
        }
    }

    fn push_entry(&mut self, key: K, score: S) {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(Reverse(HeapEntry { score, seq, key }));
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.heap.len() >= self.scores.len());
        for (key, score) in &self.scores {
            assert!(
                self.heap
                    .iter()
                    .any(|Reverse(entry)| entry.key == *key && entry.score == *score)
            );
        }
    }
}

impl<K, S> Default for LazyMinHeap<K, S>
where
    K: Eq + Hash + Clone,
    S: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_best_returns_minimum_and_skips_stale() {
        let mut heap: LazyMinHeap<&str, u32> = LazyMinHeap::new();
        heap.update("a", 5);
        heap.update("b", 2);
        heap.update("c", 8);
        heap.update("a", 1);

        assert_eq!(heap.heap_len(), 4);
        assert_eq!(heap.pop_best(), Some(("a", 1)));
        assert_eq!(heap.pop_best(), Some(("b", 2)));
        assert_eq!(heap.pop_best(), Some(("c", 8)));
        assert_eq!(heap.pop_best(), None);
    }

    #[test]
    fn peek_best_discards_removed_keys() {
        let mut heap: LazyMinHeap<u32, u32> = LazyMinHeap::new();
        heap.update(1, 1);
        heap.update(2, 2);
        heap.remove(&1);
        assert_eq!(heap.peek_best(), Some((&2, &2)));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn equal_scores_pop_in_insertion_order() {
        let mut heap: LazyMinHeap<char, u32> = LazyMinHeap::new();
        heap.update('x', 3);
        heap.update('y', 3);
        heap.update('z', 3);
        assert_eq!(heap.pop_best().map(|(k, _)| k), Some('x'));
        assert_eq!(heap.pop_best().map(|(k, _)| k), Some('y'));
    }

    #[test]
    fn maybe_rebuild_compacts_stale_entries() {
        let mut heap: LazyMinHeap<u32, u32> = LazyMinHeap::new();
        for score in 0..100 {
            heap.update(7, score);
        }
        assert_eq!(heap.heap_len(), 100);
        heap.maybe_rebuild(4);
        assert_eq!(heap.heap_len(), 1);
        assert_eq!(heap.score_of(&7), Some(&99));
        heap.debug_validate_invariants();
    }
}
