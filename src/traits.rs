//! # Separator Trait
//!
//! Every hot/cold classifier implements [`HeatSeparator`]. The host drives
//! it with one call per observed access and, at reporting time, asks for the
//! keys the policy currently considers hot.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────────────┐
//!                     │           HeatSeparator<K>               │
//!                     │                                          │
//!   write access ───► │  put(&mut, &K) → Result<(), SepError>    │
//!   read access  ───► │  get(&mut, &K) → Result<(), SepError>    │
//!                     │  is_hot_key(&, &K) → bool                │
//!   reporting    ◄─── │  hot_keys(&) → Vec<K>                    │
//!                     │  write_diagnostics(&, &mut dyn Write)    │
//!                     │  kind / len / capacity                   │
//!                     └───────────────────┬──────────────────────┘
//!                                         │
//!        ┌──────────┬──────────┬──────────┼──────────┬──────────┬──────────┐
//!        ▼          ▼          ▼          ▼          ▼          ▼          ▼
//!       LRU        LFU       LRU-K      Window     Sketch   W-TinyLFU  LIRS / S3-FIFO
//! ```
//!
//! ## Read vs. write
//!
//! | Policy      | `get` on an unseen key          |
//! |-------------|---------------------------------|
//! | LRU, LFU    | `Err(NotFound)`, no state change |
//! | LRU-K       | `Err(NotFound)`, no state change |
//! | LIRS        | `Err(NotFound)`, no state change |
//! | S3-FIFO     | `Err(NotFound)`, no state change |
//! | Window      | recorded as an access           |
//! | Sketch      | recorded as an access           |
//! | W-TinyLFU   | recorded as an access           |
//! | Heap Top-K  | recorded as an access           |
//!
//! ## Thread Safety
//!
//! Implementations are single-threaded and take `&mut self` for mutation.
//! [`SharedSeparator`](crate::sync::SharedSeparator) adds the per-instance
//! lock the host needs when several workers feed one separator.
use std::fmt;

use crate::builder::SeparatorKind;
use crate::error::SeparatorError;

/// Online hot/cold key classifier.
pub trait HeatSeparator<K> {
    /// Records a write access. May evict other keys.
    fn put(&mut self, key: &K) -> Result<(), SeparatorError>;

    /// Records a read access.
    fn get(&mut self, key: &K) -> Result<(), SeparatorError>;

    /// Returns `true` if the policy currently classifies `key` as hot.
    fn is_hot_key(&self, key: &K) -> bool;

    /// Snapshot of the hot keys, in policy-defined order.
    fn hot_keys(&self) -> Vec<K>;

    /// Human-readable dump of internal state. Not part of correctness.
    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    fn kind(&self) -> SeparatorKind;

    /// Number of resident tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resident-key bound, or `None` when the policy is time-bounded.
    fn capacity(&self) -> Option<usize>;
}

/// Marker for separators that are safe to share across worker threads.
pub trait ConcurrentSeparator: Send + Sync {}
