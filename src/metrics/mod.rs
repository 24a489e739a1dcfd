//! Per-instance access counters (feature `metrics`).
//!
//! [`SeparatorMetrics`] lives next to the separator inside its
//! [`SharedSeparator`](crate::sync::SharedSeparator) lock and is updated on
//! every call. [`snapshot`](SeparatorMetrics::snapshot) copies it out
//! together with gauges read at snapshot time.
pub mod exporter;
pub mod snapshot;

pub use exporter::PrometheusTextExporter;
pub use snapshot::SeparatorMetricsSnapshot;

use crate::error::SeparatorError;

/// Sink for metric snapshots.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}

#[derive(Debug, Default, Clone)]
pub struct SeparatorMetrics {
    pub put_calls: u64,
    pub get_calls: u64,
    pub get_not_found: u64,
    pub capacity_errors: u64,
    pub unimplemented_errors: u64,
    pub invariant_errors: u64,
    pub hot_key_checks: u64,
    pub hot_key_hits: u64,
    pub hot_keys_calls: u64,
}

impl SeparatorMetrics {
    pub fn record_put(&mut self, result: &Result<(), SeparatorError>) {
        self.put_calls += 1;
        self.record_error(result);
    }

    pub fn record_get(&mut self, result: &Result<(), SeparatorError>) {
        self.get_calls += 1;
        self.record_error(result);
    }

    pub fn record_hot_key_check(&mut self, hot: bool) {
        self.hot_key_checks += 1;
        if hot {
            self.hot_key_hits += 1;
        }
    }

    pub fn record_hot_keys(&mut self) {
        self.hot_keys_calls += 1;
    }

    fn record_error(&mut self, result: &Result<(), SeparatorError>) {
        match result {
            Ok(()) => {}
            Err(SeparatorError::NotFound) => self.get_not_found += 1,
            Err(SeparatorError::Capacity) => self.capacity_errors += 1,
            Err(SeparatorError::Unimplemented(_)) => self.unimplemented_errors += 1,
            Err(SeparatorError::Invariant(_)) => self.invariant_errors += 1,
        }
    }

    pub fn snapshot(
        &self,
        name: &str,
        len: usize,
        capacity: Option<usize>,
    ) -> SeparatorMetricsSnapshot {
        SeparatorMetricsSnapshot {
            separator: name.to_string(),
            put_calls: self.put_calls,
            get_calls: self.get_calls,
            get_not_found: self.get_not_found,
            capacity_errors: self.capacity_errors,
            unimplemented_errors: self.unimplemented_errors,
            invariant_errors: self.invariant_errors,
            hot_key_checks: self.hot_key_checks,
            hot_key_hits: self.hot_key_hits,
            hot_keys_calls: self.hot_keys_calls,
            resident_keys: len,
            capacity,
        }
    }
}
