#![no_main]

use std::sync::Arc;

use heatsep::builder::{SeparatorBuilder, SeparatorSpec};
use heatsep::clock::ManualClock;
use heatsep::error::SeparatorError;
use heatsep::policy::w_tinylfu::WTinyLfuParams;
use heatsep::traits::HeatSeparator;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary put/get/tick sequences on every separator policy
//
// First byte picks the capacity (0-31); then pairs of (op, key) bytes.
// After every operation the policy's self-check must pass, the resident
// count must stay within capacity and every reported key must be hot.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let capacity = (data[0] as usize) % 32;
    let clock = ManualClock::new(0);
    let builder = SeparatorBuilder::new().clock(Arc::new(clock.clone()));
    let specs = [
        SeparatorSpec::Lru { capacity },
        SeparatorSpec::Lfu { capacity, min_freq: 1 },
        SeparatorSpec::LruK { k: 2, capacity },
        SeparatorSpec::Window { window_ms: 16, threshold: 2 },
        SeparatorSpec::SketchWindow {
            window_size: capacity,
            epsilon: 0.05,
            delta: 0.05,
            threshold: 2,
            enable_lru: true,
        },
        SeparatorSpec::WTinyLfu { capacity, params: WTinyLfuParams::default() },
        SeparatorSpec::Lirs { capacity, lir_ratio: 0.9, max_nonresident: None },
        SeparatorSpec::S3Fifo { capacity, small_ratio: 0.1, ghost_ratio: 0.9 },
        SeparatorSpec::HeapTopK { k: capacity, threshold: 2 },
    ];
    let mut seps: Vec<_> = specs
        .iter()
        .map(|spec| builder.build::<u8>(spec).unwrap())
        .collect();

    for pair in data[1..].chunks_exact(2) {
        let op = pair[0] % 4;
        let key = pair[1];

        if op == 3 {
            clock.advance(u64::from(key % 8));
            continue;
        }
        for sep in seps.iter_mut() {
            let result = match op {
                0 | 1 => sep.put(&key),
                _ => sep.get(&key),
            };
            match result {
                Ok(()) | Err(SeparatorError::NotFound) => {}
                Err(SeparatorError::Capacity) => assert_eq!(capacity, 0),
                Err(err) => panic!("{}: {err}", sep.kind()),
            }

            sep.check_invariants().unwrap();
            if let Some(cap) = sep.capacity() {
                assert!(sep.len() <= cap);
            }
        }
    }

    for sep in &seps {
        for key in sep.hot_keys() {
            assert!(sep.is_hot_key(&key));
        }
    }
});
