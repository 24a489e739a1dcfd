//! Heat-separation policies.
//!
//! Each module holds one [`HeatSeparator`](crate::traits::HeatSeparator)
//! implementation. [`builder`](crate::builder) ties them together behind
//! [`Separator`](crate::builder::Separator).

pub mod heap_topk;
pub mod lfu;
pub mod lirs;
pub mod lru;
pub mod lru_k;
pub mod s3_fifo;
pub mod sketch;
pub mod unimplemented;
pub mod w_tinylfu;
pub mod window;
