pub use crate::builder::{Separator, SeparatorBuilder, SeparatorKind, SeparatorSpec};
pub use crate::clock::{Clock, ManualClock, MonotonicClock};
pub use crate::config::{HarnessConfig, NamedSpec};
pub use crate::error::{ConfigError, InvariantError, SeparatorError};
pub use crate::report::{CsvHotKeySink, HotKeySink, KeyStats, Overlap};
pub use crate::sync::{FanOutReport, SeparatorSet, SharedSeparator};
pub use crate::trace::{Key, TraceOp};
pub use crate::traits::HeatSeparator;

pub use crate::policy::heap_topk::HeapTopKSeparator;
pub use crate::policy::lfu::LfuSeparator;
pub use crate::policy::lirs::LirsSeparator;
pub use crate::policy::lru::LruSeparator;
pub use crate::policy::lru_k::LruKSeparator;
pub use crate::policy::s3_fifo::S3FifoSeparator;
pub use crate::policy::sketch::SketchSeparator;
pub use crate::policy::w_tinylfu::{WTinyLfuParams, WTinyLfuSeparator};
pub use crate::policy::window::WindowSeparator;

#[cfg(feature = "metrics")]
pub use crate::metrics::SeparatorMetricsSnapshot;
