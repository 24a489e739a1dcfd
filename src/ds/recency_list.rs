//! Keyed recency list.
//!
//! An [`IntrusiveList`] of keys plus an `FxHashMap` index, giving O(1)
//! lookup, touch, insert and LRU pop. The front is the most recently used
//! key. Shared by the LRU separator, the sketch window and every segment of
//! W-TinyLFU.
//!
//! ```text
//!   index: FxHashMap<K, SlotId>        list: IntrusiveList<K>
//!                                      head ─► [C] ◄──► [B] ◄──► [A] ◄── tail
//!                                         MRU                       LRU
//! ```
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;

#[derive(Debug)]
pub struct RecencyList<K> {
    list: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
}

impl<K> RecencyList<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Moves `key` to the MRU position; returns `false` if it is not tracked.
    pub fn touch(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&id) => self.list.move_to_front(id),
            None => false,
        }
    }

    /// Inserts `key` at the MRU position, or touches it if already present.
    pub fn push_front(&mut self, key: K) {
        if self.touch(&key) {
            return;
        }
        let id = self.list.push_front(key.clone());
        self.index.insert(key, id);
    }

    /// Removes and returns the LRU key.
    pub fn pop_back(&mut self) -> Option<K> {
        let key = self.list.pop_back()?;
        self.index.remove(&key);
        Some(key)
    }

    /// Returns the LRU key without removing it.
    pub fn back(&self) -> Option<&K> {
        self.list.back()
    }

    pub fn front(&self) -> Option<&K> {
        self.list.front()
    }

    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => self.list.remove(id).is_some(),
            None => false,
        }
    }

    /// Iterates keys from MRU to LRU.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.list.iter()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_links()?;
        if self.list.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "recency list holds {} keys but index holds {}",
                self.list.len(),
                self.index.len()
            )));
        }
        if self.index.iter().any(|(key, &id)| self.list.get(id) != Some(key)) {
            return Err(InvariantError::new("recency index points at a foreign node"));
        }
        Ok(())
    }
}

impl<K> Default for RecencyList<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
