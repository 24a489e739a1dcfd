//! Doubly linked list over a [`SlotArena`].
//!
//! Every ordered queue in the crate is one of these: the LRU order, LRU-K
//! history and cache, each LFU frequency bucket, the LIRS stack, queue and
//! non-resident list, and the S3-FIFO small and main queues. A node's handle
//! is its arena [`SlotId`], so a policy keeps the handle in its key index and
//! relinks or unlinks the node in O(1).
//!
//! Links are kept as a pair indexed by [`End`]: `links[Front]` points toward
//! the front of the list and `links[Back]` toward the back. One `link` and
//! one `unlink` routine therefore serve both ends.
//!
//! ```text
//!   ends[Front] ─► [a] ⇄ [b] ⇄ [c] ◄─ ends[Back]
//!
//!   b.links = [Some(a), Some(c)]
//!   a.links = [None,    Some(b)]
//! ```
use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

/// One end of an [`IntrusiveList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Front,
    Back,
}

impl End {
    #[inline]
    fn slot(self) -> usize {
        match self {
            End::Front => 0,
            End::Back => 1,
        }
    }

    #[inline]
    fn opposite(self) -> End {
        match self {
            End::Front => End::Back,
            End::Back => End::Front,
        }
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    links: [Option<SlotId>; 2],
}

#[derive(Debug)]
pub struct IntrusiveList<T> {
    nodes: SlotArena<Node<T>>,
    ends: [Option<SlotId>; 2],
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotArena::with_capacity(capacity),
            ends: [None, None],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` while `id` names a node of this list.
    pub fn contains(&self, id: SlotId) -> bool {
        self.nodes.contains(id)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    pub fn end_id(&self, end: End) -> Option<SlotId> {
        self.ends[end.slot()]
    }

    pub fn front_id(&self) -> Option<SlotId> {
        self.end_id(End::Front)
    }

    pub fn back_id(&self) -> Option<SlotId> {
        self.end_id(End::Back)
    }

    pub fn front(&self) -> Option<&T> {
        self.get(self.front_id()?)
    }

    pub fn back(&self) -> Option<&T> {
        self.get(self.back_id()?)
    }

    /// Front-to-back iteration.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.front_id(),
        }
    }

    /// Adds `value` at `end` and returns its handle.
    pub fn push(&mut self, end: End, value: T) -> SlotId {
        let id = self.nodes.insert(Node {
            value,
            links: [None, None],
        });
        self.link(id, end);
        id
    }

    pub fn push_front(&mut self, value: T) -> SlotId {
        self.push(End::Front, value)
    }

    pub fn push_back(&mut self, value: T) -> SlotId {
        self.push(End::Back, value)
    }

    pub fn pop(&mut self, end: End) -> Option<T> {
        let id = self.end_id(end)?;
        self.remove(id)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.pop(End::Back)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.unlink(id)?;
        self.nodes.remove(id).map(|node| node.value)
    }

    /// Moves `id` to `end`; `false` if `id` is not in the list.
    pub fn relink(&mut self, id: SlotId, end: End) -> bool {
        if self.end_id(end) == Some(id) {
            return true;
        }
        if self.unlink(id).is_none() {
            return false;
        }
        self.link(id, end);
        true
    }

    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        self.relink(id, End::Front)
    }

    pub fn move_to_back(&mut self, id: SlotId) -> bool {
        self.relink(id, End::Back)
    }

    /// Attaches a detached node at `end`.
    fn link(&mut self, id: SlotId, end: End) {
        let outer = end.slot();
        let inner = end.opposite().slot();
        let old = self.ends[outer];
        if let Some(node) = self.nodes.get_mut(id) {
            node.links = [None, None];
            node.links[inner] = old;
        }
        match old {
            Some(old) => {
                if let Some(node) = self.nodes.get_mut(old) {
                    node.links[outer] = Some(id);
                }
            }
            None => self.ends[inner] = Some(id),
        }
        self.ends[outer] = Some(id);
    }

    /// Splices `id` out, joining its neighbours. The node stays allocated.
    fn unlink(&mut self, id: SlotId) -> Option<()> {
        let links = self.nodes.get(id)?.links;
        for side in [End::Front, End::Back] {
            let toward = side.slot();
            let away = side.opposite().slot();
            match links[toward] {
                Some(neighbour) => {
                    if let Some(node) = self.nodes.get_mut(neighbour) {
                        node.links[away] = links[away];
                    }
                }
                None => self.ends[toward] = links[away],
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.links = [None, None];
        }
        Some(())
    }

    /// Walks the list from the front and checks that every back link
    /// mirrors its forward link and that the walk covers every node.
    pub fn check_links(&self) -> Result<(), InvariantError> {
        let mut walked = 0usize;
        let mut previous = None;
        let mut cursor = self.front_id();
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get(id) else {
                return Err(InvariantError::new("list links to a vacant slot"));
            };
            if node.links[End::Front.slot()] != previous {
                return Err(InvariantError::new("list back link does not mirror forward link"));
            }
            walked += 1;
            if walked > self.len() {
                return Err(InvariantError::new("list walk revisits a node"));
            }
            previous = Some(id);
            cursor = node.links[End::Back.slot()];
        }
        if previous != self.back_id() || walked != self.len() {
            return Err(InvariantError::new(format!(
                "list walk reached {walked} of {} nodes",
                self.len()
            )));
        }
        Ok(())
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    list: &'a IntrusiveList<T>,
    next: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.nodes.get(self.next?)?;
        self.next = node.links[End::Back.slot()];
        Some(&node.value)
    }
}
