//! S3-FIFO (Simple, Scalable, Scan-resistant FIFO) heat separator.
//!
//! Three FIFO queues replace LRU bookkeeping. New keys enter a small admission
//! queue; keys that were touched while there graduate to the main queue,
//! the rest leave a fingerprint in the ghost queue. A key that returns while
//! its fingerprint is still in the ghost queue goes straight to main.
//!
//! ## Architecture
//!
//! ```text
//!   entries: FxHashMap<K, Entry { queue, id, freq, last_access }>
//!
//!   SMALL (~10%):  head ─► [new] ... [old] ◄── tail: drained on overflow
//!                                      │
//!                     freq == 0 ───────┼──────► GHOST (fingerprints, bounded)
//!                     freq  > 0 ───────▼
//!   MAIN  (~90%):  head ─► [old] ... [new] ◄── tail: promoted / ghost hits
//!                    │
//!                    └── CLOCK sweep: freq == 0 evicted, else freq -= 1 and
//!                        re-queued at the tail
//! ```
//!
//! Frequencies saturate at 3. Hot keys are main-queue keys with frequency at
//! least 1, reported head to tail.
use std::fmt::{self, Debug};
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::builder::SeparatorKind;
use crate::ds::hash::fingerprint;
use crate::ds::{GhostList, IntrusiveList, SlotId};
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

pub const DEFAULT_SMALL_RATIO: f64 = 0.1;
pub const DEFAULT_GHOST_RATIO: f64 = 0.9;
const MAX_FREQ: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueKind {
    Small,
    Main,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    queue: QueueKind,
    id: SlotId,
    freq: u8,
    last_access: u64,
}

#[derive(Debug)]
pub struct S3FifoSeparator<K> {
    entries: FxHashMap<K, Entry>,
    small: IntrusiveList<K>,
    main: IntrusiveList<K>,
    ghost: GhostList,
    small_cap: usize,
    main_cap: usize,
    capacity: usize,
    tick: u64,
}

impl<K> S3FifoSeparator<K>
where
    K: Clone + Eq + Hash,
{
    /// Uses default ratios: 10% small queue, ghost sized to 90% of capacity.
    pub fn new(capacity: usize) -> Self {
        match Self::try_with_ratios(capacity, DEFAULT_SMALL_RATIO, DEFAULT_GHOST_RATIO) {
            Ok(sep) => sep,
            Err(e) => panic!("{}", e),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `small_ratio` is not in `[0.0, 1.0]` or
    /// `ghost_ratio` is negative or non-finite.
    pub fn try_with_ratios(
        capacity: usize,
        small_ratio: f64,
        ghost_ratio: f64,
    ) -> Result<Self, ConfigError> {
        if !small_ratio.is_finite() || !(0.0..=1.0).contains(&small_ratio) {
            return Err(ConfigError::new(format!(
                "small_ratio must be in [0.0, 1.0], got {small_ratio}"
            )));
        }
        if !ghost_ratio.is_finite() || ghost_ratio < 0.0 {
            return Err(ConfigError::new(format!(
                "ghost_ratio must be finite and non-negative, got {ghost_ratio}"
            )));
        }

        let small_cap = (capacity as f64 * small_ratio) as usize;
        let main_cap = capacity - small_cap;
        let ghost_cap = (capacity as f64 * ghost_ratio).round() as usize;

        Ok(Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            small: IntrusiveList::with_capacity(small_cap + 1),
            main: IntrusiveList::with_capacity(main_cap + 1),
            ghost: GhostList::new(ghost_cap),
            small_cap,
            main_cap,
            capacity,
            tick: 0,
        })
    }

    pub fn small_len(&self) -> usize {
        self.small.len()
    }

    pub fn main_len(&self) -> usize {
        self.main.len()
    }

    pub fn ghost_len(&self) -> usize {
        self.ghost.len()
    }

    pub fn ghost_capacity(&self) -> usize {
        self.ghost.capacity()
    }

    pub fn frequency(&self, key: &K) -> Option<u8> {
        self.entries.get(key).map(|entry| entry.freq)
    }

    /// Logical tick of the key's last access.
    pub fn last_access(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.last_access)
    }

    pub fn in_main(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.queue == QueueKind::Main)
    }

    fn touch(&mut self, key: &K) -> bool {
        self.tick += 1;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.freq = (entry.freq + 1).min(MAX_FREQ);
                entry.last_access = self.tick;
                true
            }
            None => false,
        }
    }

    fn insert_new(&mut self, key: &K) {
        let fp = fingerprint(key);
        if self.ghost.remove(fp) {
            let id = self.main.push_back(key.clone());
            self.entries.insert(
                key.clone(),
                Entry {
                    queue: QueueKind::Main,
                    id,
                    freq: 0,
                    last_access: self.tick,
                },
            );
            if self.main.len() > self.main_cap {
                self.evict_from_main();
            }
            return;
        }

        let id = self.small.push_front(key.clone());
        self.entries.insert(
            key.clone(),
            Entry {
                queue: QueueKind::Small,
                id,
                freq: 0,
                last_access: self.tick,
            },
        );
        if self.small.len() > self.small_cap {
            self.evict_from_small();
        }
    }

    fn evict_from_small(&mut self) {
        while self.small.len() > self.small_cap {
            let Some(key) = self.small.pop_back() else {
                break;
            };
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            if entry.freq == 0 {
                self.entries.remove(&key);
                self.ghost.record(fingerprint(&key));
            } else {
                entry.id = self.main.push_back(key);
                entry.queue = QueueKind::Main;
                if self.main.len() > self.main_cap {
                    self.evict_from_main();
                }
            }
        }
    }

    /// CLOCK sweep from the head until one key is evicted.
    fn evict_from_main(&mut self) {
        while let Some(head) = self.main.front_id() {
            let Some(key) = self.main.get(head).cloned() else {
                break;
            };
            let Some(entry) = self.entries.get_mut(&key) else {
                self.main.remove(head);
                continue;
            };
            if entry.freq == 0 {
                self.main.remove(head);
                self.entries.remove(&key);
                return;
            }
            entry.freq -= 1;
            self.main.move_to_back(head);
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.entries.len() != self.small.len() + self.main.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but small {} + main {}",
                self.entries.len(),
                self.small.len(),
                self.main.len()
            )));
        }
        if self.small.len() > self.small_cap || self.main.len() > self.main_cap {
            return Err(InvariantError::new(format!(
                "queues over capacity: small {}/{} main {}/{}",
                self.small.len(),
                self.small_cap,
                self.main.len(),
                self.main_cap
            )));
        }
        self.small.check_links()?;
        self.main.check_links()?;
        self.ghost.check_invariants()?;
        for (key, entry) in &self.entries {
            let list = match entry.queue {
                QueueKind::Small => &self.small,
                QueueKind::Main => &self.main,
            };
            if list.get(entry.id) != Some(key) || entry.freq > MAX_FREQ {
                return Err(InvariantError::new(format!(
                    "entry in {:?} with freq {} is not linked",
                    entry.queue, entry.freq
                )));
            }
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for S3FifoSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.capacity == 0 {
            return Err(SeparatorError::Capacity);
        }
        if !self.touch(key) {
            self.insert_new(key);
        }
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
            .is_some_and(|entry| entry.queue == QueueKind::Main && entry.freq >= 1)
    }

    fn hot_keys(&self) -> Vec<K> {
        self.main
            .iter()
            .filter(|key| self.is_hot_key(key))
            .cloned()
            .collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "s3_fifo capacity={} small={}/{} main={}/{} ghost={}/{}",
            self.capacity,
            self.small.len(),
            self.small_cap,
            self.main.len(),
            self.main_cap,
            self.ghost.len(),
            self.ghost.capacity()
        )?;
        for (label, list) in [("small", &self.small), ("main", &self.main)] {
            write!(out, "  {label}:")?;
            for key in list.iter() {
                let freq = self.entries.get(key).map_or(0, |entry| entry.freq);
                write!(out, " {key:?}/{freq}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::S3Fifo
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}
