//! Unified separator builder for all heat-separation policies.
//!
//! Provides one closed [`Separator`] type over every policy so the host can
//! hold a heterogeneous set of instances without boxing, plus the
//! [`SeparatorKind`] tag table the configuration loader resolves names
//! against.
//!
//! ## Example
//!
//! ```rust
//! use heatsep::builder::{SeparatorBuilder, SeparatorSpec};
//! use heatsep::traits::HeatSeparator;
//!
//! let mut sep = SeparatorBuilder::new()
//!     .build::<u64>(&SeparatorSpec::Lru { capacity: 2 })
//!     .unwrap();
//! sep.put(&1).unwrap();
//! sep.put(&2).unwrap();
//! assert!(sep.is_hot_key(&1));
//! ```

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use crate::clock::{Clock, MonotonicClock};
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::policy::heap_topk::HeapTopKSeparator;
use crate::policy::lfu::LfuSeparator;
use crate::policy::lirs::LirsSeparator;
use crate::policy::lru::LruSeparator;
use crate::policy::lru_k::LruKSeparator;
use crate::policy::s3_fifo::S3FifoSeparator;
use crate::policy::sketch::SketchSeparator;
use crate::policy::unimplemented::NotImplementedSeparator;
use crate::policy::w_tinylfu::{WTinyLfuParams, WTinyLfuSeparator};
use crate::policy::window::WindowSeparator;
use crate::traits::HeatSeparator;

/// Available heat-separation policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeparatorKind {
    /// Least Recently Used; every resident key is hot.
    Lru,
    /// Least Frequently Used with O(1) frequency buckets.
    Lfu,
    /// LRU-K: hot after K accesses.
    LruK,
    /// Access-count threshold over a sliding time window.
    Window,
    /// Count-Min Sketch estimate gated by an LRU window.
    SketchWindow,
    /// Window LRU + segmented main area + TinyLFU admission.
    WTinyLfu,
    /// Low Inter-reference Recency Set.
    Lirs,
    /// Small/main/ghost FIFO queues.
    S3Fifo,
    /// Exact-count top-K over a min-heap. Builder only.
    HeapTopK,
    /// Placeholder; not implemented.
    Arc,
    /// Placeholder; not implemented.
    HotRing,
}

impl SeparatorKind {
    pub const ALL: [SeparatorKind; 11] = [
        SeparatorKind::Lru,
        SeparatorKind::Lfu,
        SeparatorKind::LruK,
        SeparatorKind::Window,
        SeparatorKind::SketchWindow,
        SeparatorKind::WTinyLfu,
        SeparatorKind::Lirs,
        SeparatorKind::S3Fifo,
        SeparatorKind::HeapTopK,
        SeparatorKind::Arc,
        SeparatorKind::HotRing,
    ];

    /// Configuration tag.
    pub fn tag(self) -> &'static str {
        match self {
            SeparatorKind::Lru => "lru",
            SeparatorKind::Lfu => "lfu",
            SeparatorKind::LruK => "lruk",
            SeparatorKind::Window => "window",
            SeparatorKind::SketchWindow => "sketch_window",
            SeparatorKind::WTinyLfu => "w_tinylfu",
            SeparatorKind::Lirs => "lirs",
            SeparatorKind::S3Fifo => "s3_fifo",
            SeparatorKind::HeapTopK => "heap_topk",
            SeparatorKind::Arc => "arc",
            SeparatorKind::HotRing => "hotring",
        }
    }

    /// Resolves a configuration tag. Tags are matched exactly; `heap_topk`
    /// is not configurable and resolves to `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.is_configurable())
            .find(|kind| kind.tag() == tag)
    }

    pub fn is_configurable(self) -> bool {
        !matches!(self, SeparatorKind::HeapTopK)
    }

    pub fn is_implemented(self) -> bool {
        !matches!(self, SeparatorKind::Arc | SeparatorKind::HotRing)
    }
}

impl fmt::Display for SeparatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Typed, validated construction parameters for one separator instance.
#[derive(Debug, Clone, PartialEq)]
pub enum SeparatorSpec {
    Lru {
        capacity: usize,
    },
    Lfu {
        capacity: usize,
        min_freq: u64,
    },
    LruK {
        k: u64,
        capacity: usize,
    },
    Window {
        window_ms: u64,
        threshold: u64,
    },
    SketchWindow {
        window_size: usize,
        epsilon: f64,
        delta: f64,
        threshold: u64,
        enable_lru: bool,
    },
    WTinyLfu {
        capacity: usize,
        params: WTinyLfuParams,
    },
    Lirs {
        capacity: usize,
        lir_ratio: f64,
        max_nonresident: Option<usize>,
    },
    S3Fifo {
        capacity: usize,
        small_ratio: f64,
        ghost_ratio: f64,
    },
    HeapTopK {
        k: usize,
        threshold: u64,
    },
    Unimplemented(SeparatorKind),
}

impl SeparatorSpec {
    pub fn kind(&self) -> SeparatorKind {
        match self {
            SeparatorSpec::Lru { .. } => SeparatorKind::Lru,
            SeparatorSpec::Lfu { .. } => SeparatorKind::Lfu,
            SeparatorSpec::LruK { .. } => SeparatorKind::LruK,
            SeparatorSpec::Window { .. } => SeparatorKind::Window,
            SeparatorSpec::SketchWindow { .. } => SeparatorKind::SketchWindow,
            SeparatorSpec::WTinyLfu { .. } => SeparatorKind::WTinyLfu,
            SeparatorSpec::Lirs { .. } => SeparatorKind::Lirs,
            SeparatorSpec::S3Fifo { .. } => SeparatorKind::S3Fifo,
            SeparatorSpec::HeapTopK { .. } => SeparatorKind::HeapTopK,
            SeparatorSpec::Unimplemented(kind) => *kind,
        }
    }
}

/// A separator of any policy, dispatched statically.
#[derive(Debug)]
pub enum Separator<K> {
    Lru(LruSeparator<K>),
    Lfu(LfuSeparator<K>),
    LruK(LruKSeparator<K>),
    Window(WindowSeparator<K>),
    SketchWindow(SketchSeparator<K>),
    WTinyLfu(WTinyLfuSeparator<K>),
    Lirs(LirsSeparator<K>),
    S3Fifo(S3FifoSeparator<K>),
    HeapTopK(HeapTopKSeparator<K>),
    Unimplemented(NotImplementedSeparator),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Separator::Lru($inner) => $body,
            Separator::Lfu($inner) => $body,
            Separator::LruK($inner) => $body,
            Separator::Window($inner) => $body,
            Separator::SketchWindow($inner) => $body,
            Separator::WTinyLfu($inner) => $body,
            Separator::Lirs($inner) => $body,
            Separator::S3Fifo($inner) => $body,
            Separator::HeapTopK($inner) => $body,
            Separator::Unimplemented($inner) => $body,
        }
    };
}

impl<K> HeatSeparator<K> for Separator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn put(&mut self, key: &K) -> Result<(), SeparatorError> {
        dispatch!(self, sep => HeatSeparator::<K>::put(sep, key))
    }

    fn get(&mut self, key: &K) -> Result<(), SeparatorError> {
        dispatch!(self, sep => HeatSeparator::<K>::get(sep, key))
    }

    fn is_hot_key(&self, key: &K) -> bool {
        dispatch!(self, sep => HeatSeparator::<K>::is_hot_key(sep, key))
    }

    fn hot_keys(&self) -> Vec<K> {
        dispatch!(self, sep => HeatSeparator::<K>::hot_keys(sep))
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        dispatch!(self, sep => HeatSeparator::<K>::write_diagnostics(sep, out))
    }

    fn kind(&self) -> SeparatorKind {
        dispatch!(self, sep => HeatSeparator::<K>::kind(sep))
    }

    fn len(&self) -> usize {
        dispatch!(self, sep => HeatSeparator::<K>::len(sep))
    }

    fn capacity(&self) -> Option<usize> {
        dispatch!(self, sep => HeatSeparator::<K>::capacity(sep))
    }
}

impl<K> Separator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Runs the policy's structural self-check, where it has one.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        match self {
            Separator::Lru(sep) => sep.check_invariants(),
            Separator::Lfu(sep) => sep.check_invariants(),
            Separator::LruK(sep) => sep.check_invariants(),
            Separator::Window(sep) => sep.check_invariants(),
            Separator::SketchWindow(_) => Ok(()),
            Separator::WTinyLfu(sep) => sep.check_invariants(),
            Separator::Lirs(sep) => sep.check_invariants(),
            Separator::S3Fifo(sep) => sep.check_invariants(),
            Separator::HeapTopK(sep) => sep.check_invariants(),
            Separator::Unimplemented(_) => Ok(()),
        }
    }
}

/// Builder for separator instances.
///
/// The only shared setting is the clock handed to time-window policies;
/// everything else comes from the [`SeparatorSpec`].
#[derive(Debug, Clone)]
pub struct SeparatorBuilder {
    clock: Arc<dyn Clock>,
}

impl SeparatorBuilder {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Use `clock` for every time-window separator this builder creates.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build a separator from a validated spec.
    ///
    /// # Example
    ///
    /// ```rust
    /// use heatsep::builder::{SeparatorBuilder, SeparatorKind, SeparatorSpec};
    /// use heatsep::traits::HeatSeparator;
    ///
    /// let builder = SeparatorBuilder::new();
    /// let lruk = builder
    ///     .build::<u64>(&SeparatorSpec::LruK { k: 2, capacity: 100 })
    ///     .unwrap();
    /// assert_eq!(lruk.kind(), SeparatorKind::LruK);
    ///
    /// let arc = builder
    ///     .build::<u64>(&SeparatorSpec::Unimplemented(SeparatorKind::Arc))
    ///     .unwrap();
    /// assert_eq!(arc.capacity(), None);
    /// ```
    pub fn build<K>(&self, spec: &SeparatorSpec) -> Result<Separator<K>, ConfigError>
    where
        K: Clone + Eq + Hash + Debug,
    {
        let sep = match spec {
            SeparatorSpec::Lru { capacity } => Separator::Lru(LruSeparator::new(*capacity)),
            SeparatorSpec::Lfu { capacity, min_freq } => {
                Separator::Lfu(LfuSeparator::with_min_freq(*capacity, *min_freq))
            }
            SeparatorSpec::LruK { k, capacity } => {
                Separator::LruK(LruKSeparator::try_new(*k, *capacity)?)
            }
            SeparatorSpec::Window {
                window_ms,
                threshold,
            } => Separator::Window(WindowSeparator::try_with_clock(
                *window_ms,
                *threshold,
                Arc::clone(&self.clock),
            )?),
            SeparatorSpec::SketchWindow {
                window_size,
                epsilon,
                delta,
                threshold,
                enable_lru,
            } => Separator::SketchWindow(SketchSeparator::try_new(
                *window_size,
                *epsilon,
                *delta,
                *threshold,
                *enable_lru,
            )?),
            SeparatorSpec::WTinyLfu { capacity, params } => Separator::WTinyLfu(
                WTinyLfuSeparator::try_with_params(*capacity, params.clone())?,
            ),
            SeparatorSpec::Lirs {
                capacity,
                lir_ratio,
                max_nonresident,
            } => Separator::Lirs(LirsSeparator::try_with_params(
                *capacity,
                *lir_ratio,
                *max_nonresident,
            )?),
            SeparatorSpec::S3Fifo {
                capacity,
                small_ratio,
                ghost_ratio,
            } => Separator::S3Fifo(S3FifoSeparator::try_with_ratios(
                *capacity,
                *small_ratio,
                *ghost_ratio,
            )?),
            SeparatorSpec::HeapTopK { k, threshold } => {
                Separator::HeapTopK(HeapTopKSeparator::new(*k, *threshold))
            }
            SeparatorSpec::Unimplemented(kind) => {
                Separator::Unimplemented(NotImplementedSeparator::new(*kind))
            }
        };
        tracing::info!(kind = %spec.kind(), "heat separator initialized");
        Ok(sep)
    }
}

impl Default for SeparatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
