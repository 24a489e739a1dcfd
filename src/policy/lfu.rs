//! LFU heat separator.
//!
//! Keys are grouped into frequency buckets. Within a bucket the most recent
//! arrival sits at the front, so eviction from the back of the minimum
//! bucket breaks frequency ties by recency.
//!
//! ## Architecture
//!
//! ```text
//!   entries: FxHashMap<K, (freq, SlotId)>
//!
//!   buckets: FxHashMap<u64, IntrusiveList<K>>
//!     freq 3 ─► [a]
//!     freq 1 ─► [c] ◄──► [b]          ◄── min_freq = 1, victim = b
//! ```
//!
//! ## Operations
//! - access: unlink from bucket `f`, link at the front of bucket `f + 1`;
//!   if bucket `f` empties and was the minimum, `min_freq` advances
//! - insert at capacity: pop the back of bucket `min_freq`, then insert the
//!   new key with frequency 1 and reset `min_freq` to 1
//!
//! All operations are O(1). `hot_keys` sorts the distinct bucket
//! frequencies, which is bounded by the number of resident keys.
use std::fmt::{self, Debug};
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::builder::SeparatorKind;
use crate::ds::{IntrusiveList, SlotId};
use crate::error::{InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

#[derive(Debug)]
pub struct LfuSeparator<K> {
    entries: FxHashMap<K, (u64, SlotId)>,
    buckets: FxHashMap<u64, IntrusiveList<K>>,
    min_freq: u64,
    capacity: usize,
}

impl<K> LfuSeparator<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        Self::with_min_freq(capacity, 1)
    }

    /// `min_freq` seeds the minimum-frequency cursor; it is reset to 1 by the
    /// first insertion.
    pub fn with_min_freq(capacity: usize, min_freq: u64) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            buckets: FxHashMap::default(),
            min_freq: min_freq.max(1),
            capacity,
        }
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|(freq, _)| *freq)
    }

    pub fn min_freq(&self) -> u64 {
        self.min_freq
    }

    fn touch(&mut self, key: &K) -> bool {
        let Some(&(freq, id)) = self.entries.get(key) else {
            return false;
        };
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return false;
        };
        let Some(owned) = bucket.remove(id) else {
            return false;
        };
        if bucket.is_empty() {
            self.buckets.remove(&freq);
            if self.min_freq == freq {
                self.min_freq = freq + 1;
            }
        }
        let next = freq + 1;
        let new_id = self.buckets.entry(next).or_default().push_front(owned);
        self.entries.insert(key.clone(), (next, new_id));
        true
    }

    fn evict_one(&mut self) {
        let Some(bucket) = self.buckets.get_mut(&self.min_freq) else {
            return;
        };
        if let Some(victim) = bucket.pop_back() {
            self.entries.remove(&victim);
        }
        if bucket.is_empty() {
            self.buckets.remove(&self.min_freq);
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let bucketed: usize = self.buckets.values().map(IntrusiveList::len).sum();
        if bucketed != self.entries.len() {
            return Err(InvariantError::new(format!(
                "LFU buckets hold {} keys but index holds {}",
                bucketed,
                self.entries.len()
            )));
        }
        if self.entries.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "LFU holds {} keys with capacity {}",
                self.entries.len(),
                self.capacity
            )));
        }
        for (key, &(freq, id)) in &self.entries {
            let linked = self
                .buckets
                .get(&freq)
                .and_then(|bucket| bucket.get(id))
                .is_some_and(|k| k == key);
            if !linked {
                return Err(InvariantError::new(format!(
                    "LFU entry with frequency {freq} is not linked in its bucket"
                )));
            }
        }
        if !self.entries.is_empty() && !self.buckets.contains_key(&self.min_freq) {
            return Err(InvariantError::new(format!(
                "LFU min_freq {} has no bucket",
                self.min_freq
            )));
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for LfuSeparator<K>
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
        self.min_freq = 1;
        let id = self.buckets.entry(1).or_default().push_front(key.clone());
        self.entries.insert(key.clone(), (1, id));
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
        self.entries.contains_key(key)
    }

    /// Highest frequency first; most recent first within a frequency.
    fn hot_keys(&self) -> Vec<K> {
        let mut freqs: Vec<u64> = self.buckets.keys().copied().collect();
        freqs.sort_unstable_by(|a, b| b.cmp(a));
        freqs
            .iter()
            .filter_map(|freq| self.buckets.get(freq))
            .flat_map(|bucket| bucket.iter().cloned())
            .collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "lfu capacity={} len={} min_freq={}",
            self.capacity,
            self.entries.len(),
            self.min_freq
        )?;
        let mut freqs: Vec<&u64> = self.buckets.keys().collect();
        freqs.sort_unstable();
        for freq in freqs {
            let keys: Vec<&K> = self.buckets[freq].iter().collect();
            writeln!(out, "  freq {freq}: {keys:?}")?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::Lfu
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}
