//! Separator configurations shared by the benchmarks.

use std::sync::Arc;

use heatsep::builder::{Separator, SeparatorBuilder, SeparatorSpec};
use heatsep::clock::ManualClock;
use heatsep::policy::w_tinylfu::WTinyLfuParams;

/// One spec per implemented policy, sized to `capacity` keys.
pub fn all_specs(capacity: usize) -> Vec<(&'static str, SeparatorSpec)> {
    vec![
        ("lru", SeparatorSpec::Lru { capacity }),
        (
            "lfu",
            SeparatorSpec::Lfu {
                capacity,
                min_freq: 1,
            },
        ),
        ("lru_k", SeparatorSpec::LruK { k: 2, capacity }),
        (
            "window",
            SeparatorSpec::Window {
                window_ms: 1_000,
                threshold: 8,
            },
        ),
        (
            "sketch",
            SeparatorSpec::SketchWindow {
                window_size: capacity * 10,
                epsilon: 0.001,
                delta: 0.01,
                threshold: 8,
                enable_lru: true,
            },
        ),
        (
            "w_tinylfu",
            SeparatorSpec::WTinyLfu {
                capacity,
                params: WTinyLfuParams::default(),
            },
        ),
        (
            "lirs",
            SeparatorSpec::Lirs {
                capacity,
                lir_ratio: 0.99,
                max_nonresident: None,
            },
        ),
        (
            "s3_fifo",
            SeparatorSpec::S3Fifo {
                capacity,
                small_ratio: 0.1,
                ghost_ratio: 0.9,
            },
        ),
        (
            "heap_topk",
            SeparatorSpec::HeapTopK {
                k: capacity,
                threshold: 2,
            },
        ),
    ]
}

/// A fresh separator on a frozen clock, so time-window policies see the
/// whole run as one window.
pub fn build(spec: &SeparatorSpec) -> Separator<u64> {
    let builder = SeparatorBuilder::new().clock(Arc::new(ManualClock::new(0)));
    match builder.build(spec) {
        Ok(sep) => sep,
        Err(e) => panic!("{}", e),
    }
}
