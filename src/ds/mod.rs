pub mod bloom;
pub mod count_min;
pub mod ghost_list;
pub mod hash;
pub mod intrusive_list;
pub mod lazy_heap;
pub mod recency_list;
pub mod slot_arena;

pub use bloom::BloomFilter;
pub use count_min::{CountMinSketch, FrequencySketch};
pub use ghost_list::GhostList;
pub use intrusive_list::{End, IntrusiveList};
pub use lazy_heap::LazyMinHeap;
pub use recency_list::RecencyList;
pub use slot_arena::{SlotArena, SlotId};
