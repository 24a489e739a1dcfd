//! Index arena with the free list threaded through vacant slots.
//!
//! Separator nodes are addressed by [`SlotId`], a plain index that stays
//! valid until its slot is freed. A vacant slot stores the index of the next
//! vacant slot, so recycling needs no side vector and a steady insert/remove
//! cycle (one eviction per admission) never grows the backing `Vec`.
//!
//! ```text
//!   slots: [ Used(a) | Vacant(→3) | Used(b) | Vacant(end) ]
//!                        ▲
//!   vacant_head ─────────┘          next insert reuses slot 1, then 3
//! ```

/// Stable handle into a [`SlotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum Slot<T> {
    Used(T),
    Vacant { next: Option<usize> },
}

#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    vacant_head: Option<usize>,
    used: usize,
}

impl<T> SlotArena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            vacant_head: None,
            used: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> SlotId {
        self.used += 1;
        if let Some(index) = self.vacant_head {
            let slot = &mut self.slots[index];
            if let Slot::Vacant { next } = slot {
                self.vacant_head = *next;
            }
            *slot = Slot::Used(value);
            return SlotId(index);
        }
        self.slots.push(Slot::Used(value));
        SlotId(self.slots.len() - 1)
    }

    /// Frees the slot and returns its value; `None` if it is already vacant.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        if let Slot::Vacant { .. } = slot {
            return None;
        }
        let taken = std::mem::replace(
            slot,
            Slot::Vacant {
                next: self.vacant_head,
            },
        );
        self.vacant_head = Some(id.0);
        self.used -= 1;
        match taken {
            Slot::Used(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.0)? {
            Slot::Used(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.0)? {
            Slot::Used(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Used(value) => Some((SlotId(index), value)),
                Slot::Vacant { .. } => None,
            })
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
