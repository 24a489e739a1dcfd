//! FIFO of 64-bit key fingerprints for S3-FIFO ghost admission.
//!
//! Keys evicted from the small queue leave only a fingerprint behind. A key
//! whose fingerprint is still here when it returns is admitted straight to
//! the main queue. Once more than `capacity` fingerprints are live, the
//! oldest is forgotten.
//!
//! ```text
//!   order: VecDeque<(fp, stamp)>            live: FxHashMap<fp, stamp>
//!   front ─► (f1, 0) (f2, 1) (f1, 2) (f3, 3) ◄── back
//!             stale            live    live
//! ```
//!
//! Removal and re-recording only touch `live`; the queue entry they leave
//! behind goes stale and is skipped when it reaches the front. The queue is
//! compacted whenever stale entries outnumber live ones, so memory stays
//! O(capacity).
use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::error::InvariantError;

#[derive(Debug)]
pub struct GhostList {
    order: VecDeque<(u64, u64)>,
    live: FxHashMap<u64, u64>,
    capacity: usize,
    next_stamp: u64,
}

impl GhostList {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            live: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
            next_stamp: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, fingerprint: u64) -> bool {
        self.live.contains_key(&fingerprint)
    }

    /// Records `fingerprint` as the newest ghost. Recording a live
    /// fingerprint again refreshes its age.
    pub fn record(&mut self, fingerprint: u64) {
        if self.capacity == 0 {
            return;
        }
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.live.insert(fingerprint, stamp);
        self.order.push_back((fingerprint, stamp));
        while self.live.len() > self.capacity {
            self.forget_oldest();
        }
        if self.order.len() > 2 * self.live.len() + 8 {
            let live = &self.live;
            self.order
                .retain(|(fp, stamp)| live.get(fp) == Some(stamp));
        }
    }

    /// Forgets `fingerprint`; `true` if it was live.
    pub fn remove(&mut self, fingerprint: u64) -> bool {
        self.live.remove(&fingerprint).is_some()
    }

    fn forget_oldest(&mut self) {
        while let Some((fp, stamp)) = self.order.pop_front() {
            if self.live.get(&fp) == Some(&stamp) {
                self.live.remove(&fp);
                return;
            }
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.live.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "ghost holds {} fingerprints with capacity {}",
                self.live.len(),
                self.capacity
            )));
        }
        let queued = self
            .order
            .iter()
            .filter(|(fp, stamp)| self.live.get(fp) == Some(stamp))
            .count();
        if queued != self.live.len() {
            return Err(InvariantError::new(format!(
                "ghost queue holds {queued} live entries but index holds {}",
                self.live.len()
            )));
        }
        Ok(())
    }
}
