#![no_main]

use heatsep::report::KeyStats;
use heatsep::trace::{self, TraceOp, TraceReader};
use libfuzzer_sys::fuzz_target;

// Fuzz trace line parsing
//
// Parsing never panics, errors carry a 1-based line number and parsed
// keys are never empty.
fuzz_target!(|data: &[u8]| {
    let mut stats = KeyStats::new();
    for result in TraceReader::new(data) {
        match result {
            Ok(op) => {
                assert!(!op.key().is_empty());
                trace::record(&op, &mut stats);
                if let TraceOp::Delete(key) = &op {
                    assert_eq!(stats.count(key), 0);
                }
            }
            Err(err) => assert!(err.line() >= 1),
        }
    }
});
