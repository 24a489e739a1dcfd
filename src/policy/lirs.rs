//! LIRS heat separator.
//!
//! LIRS ranks keys by inter-reference recency (how many distinct keys were
//! touched between a key's last two accesses) instead of plain recency. Keys
//! with a short reuse distance hold LIR status and are the hot set; the rest
//! are HIR and compete for a small resident quota.
//!
//! ## Architecture
//!
//! ```text
//!   nodes: SlotArena<Node>        index: FxHashMap<K, SlotId>
//!
//!   stack S (recency history, top = most recent)
//!     top ─► [h1 HIR] [a LIR] [g NHIR] [b LIR] ◄── bottom (always LIR after pruning)
//!
//!   queue Q (resident HIR keys, front = most recent)
//!     front ─► [h1] [h0] ◄── back: next to lose residency
//!
//!   ghost G (non-resident HIR keys still in S, front = newest)
//!     front ─► [g] ◄── back: dropped from S first when G overflows
//! ```
//!
//! A node carries independent optional handles into S, Q and G and is
//! destroyed only once it is in none of them.
//!
//! ## Quotas
//! - LIR: `floor(capacity * lir_ratio)` (default ratio 0.99), at most `capacity - 1`
//! - HIR resident: `max(floor(capacity * (1 - lir_ratio)), 1)`
//! - Non-resident history: `max_nonresident` nodes (default `capacity`)
use std::fmt::{self, Debug};
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::builder::SeparatorKind;
use crate::ds::{IntrusiveList, SlotArena, SlotId};
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::traits::HeatSeparator;

pub const DEFAULT_LIR_RATIO: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LirsStatus {
    Lir,
    HirResident,
    HirNonResident,
}

#[derive(Debug)]
struct Node<K> {
    key: K,
    status: LirsStatus,
    stack: Option<SlotId>,
    queue: Option<SlotId>,
    ghost: Option<SlotId>,
}

#[derive(Debug)]
pub struct LirsSeparator<K> {
    nodes: SlotArena<Node<K>>,
    index: FxHashMap<K, SlotId>,
    stack: IntrusiveList<SlotId>,
    queue: IntrusiveList<SlotId>,
    ghost: IntrusiveList<SlotId>,
    lir_count: usize,
    lir_cap: usize,
    hir_cap: usize,
    max_nonresident: usize,
    capacity: usize,
}

impl<K> LirsSeparator<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        match Self::try_with_params(capacity, DEFAULT_LIR_RATIO, None) {
            Ok(sep) => sep,
            Err(e) => panic!("{}", e),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `lir_ratio` is not in `(0, 1)`.
    pub fn try_with_params(
        capacity: usize,
        lir_ratio: f64,
        max_nonresident: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if !lir_ratio.is_finite() || lir_ratio <= 0.0 || lir_ratio >= 1.0 {
            return Err(ConfigError::new(format!(
                "lir_ratio must be in (0.0, 1.0), got {lir_ratio}"
            )));
        }
        let lir_cap = ((capacity as f64 * lir_ratio) as usize).min(capacity.saturating_sub(1));
        let hir_cap = ((capacity as f64 * (1.0 - lir_ratio)) as usize).max(1);
        Ok(Self {
            nodes: SlotArena::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            stack: IntrusiveList::with_capacity(capacity),
            queue: IntrusiveList::with_capacity(hir_cap),
            ghost: IntrusiveList::new(),
            lir_count: 0,
            lir_cap,
            hir_cap,
            max_nonresident: max_nonresident.unwrap_or(capacity),
            capacity,
        })
    }

    pub fn status(&self, key: &K) -> Option<LirsStatus> {
        let id = *self.index.get(key)?;
        self.nodes.get(id).map(|node| node.status)
    }

    pub fn lir_count(&self) -> usize {
        self.lir_count
    }

    /// `(lir, hir_resident)` quotas.
    pub fn quotas(&self) -> (usize, usize) {
        (self.lir_cap, self.hir_cap)
    }

    /// Non-resident keys still remembered in the history stack.
    pub fn nonresident_len(&self) -> usize {
        self.ghost.len()
    }

    fn resident(&self) -> usize {
        self.lir_count + self.queue.len()
    }

    fn must_free(&self) -> bool {
        self.resident() >= self.capacity || self.queue.len() >= self.hir_cap
    }

    fn insert_new(&mut self, key: &K) {
        while self.must_free() {
            if !self.free_one() {
                break;
            }
        }
        let id = self.nodes.insert(Node {
            key: key.clone(),
            status: LirsStatus::Lir,
            stack: None,
            queue: None,
            ghost: None,
        });
        let stack_id = self.stack.push_front(id);
        let queue_id = if self.lir_count < self.lir_cap {
            self.lir_count += 1;
            None
        } else {
            Some(self.queue.push_front(id))
        };
        if let Some(node) = self.nodes.get_mut(id) {
            node.stack = Some(stack_id);
            if queue_id.is_some() {
                node.status = LirsStatus::HirResident;
                node.queue = queue_id;
            }
        }
        self.index.insert(key.clone(), id);
    }

    fn access(&mut self, id: SlotId) -> Result<(), SeparatorError> {
        let (status, stack_pos, queue_pos, ghost_pos) = match self.nodes.get(id) {
            Some(node) => (node.status, node.stack, node.queue, node.ghost),
            None => {
                return Err(InvariantError::new("LIRS index points at a freed node").into());
            }
        };

        match (status, stack_pos) {
            (LirsStatus::Lir, Some(pos)) => {
                let was_bottom = self.stack.back_id() == Some(pos);
                self.stack.move_to_front(pos);
                if was_bottom {
                    self.prune();
                }
            }
            (LirsStatus::Lir, None) => {
                return Err(InvariantError::new("LIR node missing from stack").into());
            }
            (LirsStatus::HirResident, Some(pos)) => {
                self.stack.move_to_front(pos);
                if let Some(qpos) = queue_pos {
                    self.queue.remove(qpos);
                }
                if let Some(node) = self.nodes.get_mut(id) {
                    node.status = LirsStatus::Lir;
                    node.queue = None;
                }
                self.lir_count += 1;
                self.rebalance();
            }
            (LirsStatus::HirResident, None) => {
                let pos = self.stack.push_front(id);
                if let Some(qpos) = queue_pos {
                    self.queue.move_to_front(qpos);
                }
                if let Some(node) = self.nodes.get_mut(id) {
                    node.stack = Some(pos);
                }
            }
            (LirsStatus::HirNonResident, _) => {
                if let Some(gpos) = ghost_pos {
                    self.ghost.remove(gpos);
                }
                if let Some(node) = self.nodes.get_mut(id) {
                    node.ghost = None;
                }
                while self.must_free() {
                    if !self.free_one() {
                        break;
                    }
                }
                let stack_pos = self.nodes.get(id).and_then(|node| node.stack);
                match stack_pos {
                    Some(pos) => {
                        self.stack.move_to_front(pos);
                        if let Some(node) = self.nodes.get_mut(id) {
                            node.status = LirsStatus::Lir;
                        }
                        self.lir_count += 1;
                        self.rebalance();
                    }
                    None => {
                        let pos = self.stack.push_front(id);
                        let qpos = self.queue.push_front(id);
                        if let Some(node) = self.nodes.get_mut(id) {
                            node.status = LirsStatus::HirResident;
                            node.stack = Some(pos);
                            node.queue = Some(qpos);
                        }
                        self.prune();
                    }
                }
            }
        }
        Ok(())
    }

    /// Demotes the bottom LIR while over quota, then prunes.
    fn rebalance(&mut self) {
        self.prune();
        while self.lir_count > self.lir_cap {
            let Some(bottom) = self.stack.pop_back() else {
                break;
            };
            let qpos = self.queue.push_front(bottom);
            if let Some(node) = self.nodes.get_mut(bottom) {
                node.status = LirsStatus::HirResident;
                node.stack = None;
                node.queue = Some(qpos);
            }
            self.lir_count -= 1;
            self.prune();
        }
    }

    /// Pops non-LIR entries off the stack bottom.
    fn prune(&mut self) {
        while let Some(&bottom) = self.stack.back() {
            let status = match self.nodes.get(bottom) {
                Some(node) => node.status,
                None => {
                    self.stack.pop_back();
                    continue;
                }
            };
            if status == LirsStatus::Lir {
                break;
            }
            self.stack.pop_back();
            let orphan = match self.nodes.get_mut(bottom) {
                Some(node) => {
                    node.stack = None;
                    node.queue.is_none()
                }
                None => false,
            };
            if orphan {
                self.destroy(bottom);
            }
        }
    }

    /// Releases residency of the oldest resident HIR key.
    fn free_one(&mut self) -> bool {
        let Some(id) = self.queue.pop_back() else {
            return false;
        };
        let in_stack = match self.nodes.get_mut(id) {
            Some(node) => {
                node.queue = None;
                node.status = LirsStatus::HirNonResident;
                node.stack.is_some()
            }
            None => return true,
        };
        if in_stack {
            let gpos = self.ghost.push_front(id);
            if let Some(node) = self.nodes.get_mut(id) {
                node.ghost = Some(gpos);
            }
            self.bound_nonresident();
        } else {
            self.destroy(id);
        }
        true
    }

    fn bound_nonresident(&mut self) {
        while self.ghost.len() > self.max_nonresident {
            let Some(id) = self.ghost.pop_back() else {
                break;
            };
            if let Some(pos) = self.nodes.get(id).and_then(|node| node.stack) {
                self.stack.remove(pos);
            }
            self.destroy(id);
        }
    }

    fn destroy(&mut self, id: SlotId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        if let Some(gpos) = node.ghost {
            self.ghost.remove(gpos);
        }
        self.index.remove(&node.key);
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for list in [&self.stack, &self.queue, &self.ghost] {
            list.check_links()?;
        }
        if self.index.len() != self.nodes.len() {
            return Err(InvariantError::new(format!(
                "LIRS index holds {} keys but arena holds {} nodes",
                self.index.len(),
                self.nodes.len()
            )));
        }
        let mut lir = 0;
        for (id, node) in self.nodes.iter() {
            let linked = |list: &IntrusiveList<SlotId>, pos: Option<SlotId>| {
                pos.is_some_and(|pos| list.get(pos) == Some(&id))
            };
            let in_stack = linked(&self.stack, node.stack);
            let in_queue = linked(&self.queue, node.queue);
            let in_ghost = linked(&self.ghost, node.ghost);
            if node.stack.is_some() != in_stack
                || node.queue.is_some() != in_queue
                || node.ghost.is_some() != in_ghost
            {
                return Err(InvariantError::new("LIRS node handle points at a foreign slot"));
            }
            let ok = match node.status {
                LirsStatus::Lir => in_stack && !in_queue && !in_ghost,
                LirsStatus::HirResident => in_queue && !in_ghost,
                LirsStatus::HirNonResident => in_stack && in_ghost && !in_queue,
            };
            if !ok {
                return Err(InvariantError::new(format!(
                    "LIRS node in state {:?} has stack={} queue={} ghost={}",
                    node.status, in_stack, in_queue, in_ghost
                )));
            }
            if node.status == LirsStatus::Lir {
                lir += 1;
            }
        }
        if lir != self.lir_count || self.lir_count > self.lir_cap {
            return Err(InvariantError::new(format!(
                "LIRS counts {} LIR nodes, tracks {}, quota {}",
                lir, self.lir_count, self.lir_cap
            )));
        }
        if self.resident() > self.capacity {
            return Err(InvariantError::new(format!(
                "LIRS holds {} resident keys with capacity {}",
                self.resident(),
                self.capacity
            )));
        }
        if self.ghost.len() > self.max_nonresident {
            return Err(InvariantError::new("LIRS non-resident history over bound"));
        }
        if self.lir_count > 0 {
            let bottom_is_lir = self
                .stack
                .back()
                .and_then(|id| self.nodes.get(*id))
                .is_some_and(|node| node.status == LirsStatus::Lir);
            if !bottom_is_lir {
                return Err(InvariantError::new("LIRS stack bottom is not LIR"));
            }
        }
        Ok(())
    }
}

impl<K> HeatSeparator<K> for LirsSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        if self.capacity == 0 {
            return Err(SeparatorError::Capacity);
        }
        match self.index.get(key) {
            Some(&id) => self.access(id),
            None => {
                self.insert_new(key);
                Ok(())
            }
        }
    }

    fn get(&mut self, key: &K) -> Result<(), SeparatorError> {
        match self.index.get(key) {
            Some(&id) => self.access(id).inspect_err(|err| {
                tracing::error!(error = %err, "lirs state corrupted");
            }),
            None => Err(SeparatorError::NotFound),
        }
    }

    fn is_hot_key(&self, key: &K) -> bool {
        self.status(key) == Some(LirsStatus::Lir)
    }

    /// LIR keys in stack order, most recent first.
    fn hot_keys(&self) -> Vec<K> {
        self.stack
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .filter(|node| node.status == LirsStatus::Lir)
            .map(|node| node.key.clone())
            .collect()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "lirs capacity={} lir={}/{} hir={}/{} nonresident={}/{}",
            self.capacity,
            self.lir_count,
            self.lir_cap,
            self.queue.len(),
            self.hir_cap,
            self.ghost.len(),
            self.max_nonresident
        )?;
        write!(out, "  stack:")?;
        for node in self.stack.iter().filter_map(|id| self.nodes.get(*id)) {
            let tag = match node.status {
                LirsStatus::Lir => "L",
                LirsStatus::HirResident => "H",
                LirsStatus::HirNonResident => "N",
            };
            write!(out, " {:?}:{tag}", node.key)?;
        }
        writeln!(out)?;
        write!(out, "  queue:")?;
        for node in self.queue.iter().filter_map(|id| self.nodes.get(*id)) {
            write!(out, " {:?}", node.key)?;
        }
        writeln!(out)
    }

    fn kind(&self) -> SeparatorKind {
        SeparatorKind::Lirs
    }

    fn len(&self) -> usize {
        self.resident()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed(capacity: usize) -> LirsSeparator<u32> {
        let mut sep = LirsSeparator::new(capacity);
        for k in 0..capacity as u32 + 1 {
            sep.put(&k).unwrap();
        }
        sep
    }

    mod basic_behavior {
        use super::*;

        #[test]
        fn test_quotas() {
            let sep: LirsSeparator<u32> = LirsSeparator::new(100);
            assert_eq!(sep.quotas(), (99, 1));
            let sep: LirsSeparator<u32> = LirsSeparator::new(10);
            assert_eq!(sep.quotas(), (9, 1));
        }

        #[test]
        fn test_fill_makes_lir_then_hir() {
            let sep = warmed(10);
            assert_eq!(sep.lir_count(), 9);
            assert_eq!(sep.status(&9), Some(LirsStatus::HirNonResident));
            assert_eq!(sep.status(&10), Some(LirsStatus::HirResident));
            assert_eq!(sep.hot_keys(), (0..9).rev().collect::<Vec<_>>());
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_nonresident_hit_becomes_lir() {
            let mut sep = warmed(10);
            sep.get(&9).unwrap();
            assert!(sep.is_hot_key(&9));
            assert_eq!(sep.status(&0), Some(LirsStatus::HirResident));
            assert_eq!(sep.status(&10), Some(LirsStatus::HirNonResident));
            assert_eq!(sep.len(), 10);
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_hir_reaccess_in_stack_promotes() {
            let mut sep = warmed(10);
            sep.get(&9).unwrap();
            sep.get(&0).unwrap();
            assert!(!sep.is_hot_key(&0));
            sep.get(&0).unwrap();
            assert!(sep.is_hot_key(&0));
            assert!(!sep.is_hot_key(&1));
            assert_eq!(sep.lir_count(), 9);
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_lir_access_moves_to_top() {
            let mut sep = warmed(10);
            sep.get(&3).unwrap();
            assert_eq!(sep.hot_keys()[0], 3);
            sep.get(&0).unwrap();
            assert_eq!(sep.hot_keys()[0], 0);
            sep.check_invariants().unwrap();
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_get_missing_is_not_found() {
            let mut sep: LirsSeparator<u32> = LirsSeparator::new(4);
            assert_eq!(sep.get(&1), Err(SeparatorError::NotFound));
        }

        #[test]
        fn test_zero_capacity_rejects_put() {
            let mut sep: LirsSeparator<u32> = LirsSeparator::new(0);
            assert_eq!(sep.put(&1), Err(SeparatorError::Capacity));
        }

        #[test]
        fn test_capacity_one_has_no_lir() {
            let mut sep = LirsSeparator::new(1);
            for k in 0..10u32 {
                sep.put(&k).unwrap();
                assert!(sep.len() <= 1);
            }
            assert!(sep.hot_keys().is_empty());
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_nonresident_history_is_bounded() {
            let mut sep = LirsSeparator::try_with_params(10, DEFAULT_LIR_RATIO, Some(3)).unwrap();
            for k in 0..100u32 {
                sep.put(&k).unwrap();
                assert!(sep.nonresident_len() <= 3);
            }
            sep.check_invariants().unwrap();
        }

        #[test]
        fn test_invalid_ratio_rejected() {
            assert!(LirsSeparator::<u32>::try_with_params(10, 1.0, None).is_err());
            assert!(LirsSeparator::<u32>::try_with_params(10, 0.0, None).is_err());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_quotas_and_links_hold(
                capacity in 1usize..30,
                ops in prop::collection::vec((any::<bool>(), 0u16..60), 0..400)
            ) {
                let mut sep = LirsSeparator::new(capacity);
                for (is_put, key) in ops {
                    if is_put {
                        sep.put(&key).unwrap();
                    } else {
                        let _ = sep.get(&key);
                    }
                    prop_assert!(sep.len() <= capacity);
                    prop_assert!(sep.lir_count() <= sep.quotas().0);
                    prop_assert!(sep.check_invariants().is_ok(), "{:?}", sep.check_invariants());
                }
            }
        }
    }
}
