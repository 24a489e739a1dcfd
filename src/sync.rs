//! Thread-safe separator handles for a multi-worker host.
//!
//! ## Architecture
//!
//! ```text
//!   worker 0 ──┐
//!   worker 1 ──┼──► SeparatorSet::put(key) ──► for each instance, in order:
//!   worker N ──┘                                 SharedSeparator { name,
//!                                                  Mutex<Separator<K>> }
//!                                                      │ lock
//!                                                      ▼
//!                                                  policy state update
//! ```
//!
//! Each [`SharedSeparator`] holds one `parking_lot::Mutex` over the full
//! policy state (plus its counters under feature `metrics`). Every call,
//! queries included, takes the lock, so concurrent callers are linearized
//! per instance. A fan-out applies the access to every instance before
//! returning; one instance failing never stops the others.
use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::builder::{Separator, SeparatorBuilder, SeparatorKind};
use crate::config::HarnessConfig;
use crate::error::{ConfigError, InvariantError, SeparatorError};
use crate::report::HotKeySink;
use crate::traits::{ConcurrentSeparator, HeatSeparator};

#[cfg(feature = "metrics")]
use crate::metrics::{MetricsExporter, SeparatorMetrics, SeparatorMetricsSnapshot};

#[derive(Debug)]
struct Inner<K> {
    separator: Separator<K>,
    #[cfg(feature = "metrics")]
    metrics: SeparatorMetrics,
}

/// A named separator behind one mutex.
#[derive(Debug)]
pub struct SharedSeparator<K> {
    name: String,
    inner: Mutex<Inner<K>>,
}

impl<K> SharedSeparator<K>
where
    K: Clone + Eq + Hash + Debug,
{
    pub fn new(name: impl Into<String>, separator: Separator<K>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                separator,
                #[cfg(feature = "metrics")]
                metrics: SeparatorMetrics::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put(&self, key: &K) -> Result<(), SeparatorError> {
        let mut inner = self.inner.lock();
        let result = inner.separator.put(key);
        #[cfg(feature = "metrics")]
        inner.metrics.record_put(&result);
        result
    }

    pub fn get(&self, key: &K) -> Result<(), SeparatorError> {
        let mut inner = self.inner.lock();
        let result = inner.separator.get(key);
        #[cfg(feature = "metrics")]
        inner.metrics.record_get(&result);
        result
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_mut))]
    pub fn is_hot_key(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let hot = inner.separator.is_hot_key(key);
        #[cfg(feature = "metrics")]
        inner.metrics.record_hot_key_check(hot);
        hot
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_mut))]
    pub fn hot_keys(&self) -> Vec<K> {
        let mut inner = self.inner.lock();
        #[cfg(feature = "metrics")]
        inner.metrics.record_hot_keys();
        inner.separator.hot_keys()
    }

    /// Diagnostic dump of the separator state.
    pub fn diagnostics(&self) -> String {
        let mut out = format!("[{}] ", self.name);
        let inner = self.inner.lock();
        // Writing into a String cannot fail.
        let _ = inner.separator.write_diagnostics(&mut out);
        out
    }

    pub fn kind(&self) -> SeparatorKind {
        self.inner.lock().separator.kind()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().separator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.inner.lock().separator.capacity()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().separator.check_invariants()
    }

    /// Runs `f` with exclusive access to the separator.
    pub fn with_separator<R>(&self, f: impl FnOnce(&mut Separator<K>) -> R) -> R {
        f(&mut self.inner.lock().separator)
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> SeparatorMetricsSnapshot {
        let inner = self.inner.lock();
        inner.metrics.snapshot(
            &self.name,
            inner.separator.len(),
            inner.separator.capacity(),
        )
    }
}

impl<K> ConcurrentSeparator for SharedSeparator<K> where K: Send {}

/// Outcome of one fan-out access.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FanOutReport {
    /// Instances that accepted the access.
    pub applied: usize,
    /// `(instance index, error)` for every instance that rejected it.
    pub failures: Vec<(usize, SeparatorError)>,
}

impl FanOutReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when some instance reported a broken internal invariant.
    pub fn has_invariant_failure(&self) -> bool {
        self.failures
            .iter()
            .any(|(_, err)| matches!(err, SeparatorError::Invariant(_)))
    }
}

/// Every configured instance, driven together.
#[derive(Debug)]
pub struct SeparatorSet<K> {
    separators: Vec<SharedSeparator<K>>,
}

impl<K> SeparatorSet<K>
where
    K: Clone + Eq + Hash + Debug,
{
    pub fn new(separators: Vec<SharedSeparator<K>>) -> Self {
        Self { separators }
    }

    /// Builds one instance per configured entry, in configuration order.
    pub fn from_config(
        config: &HarnessConfig,
        builder: &SeparatorBuilder,
    ) -> Result<Self, ConfigError> {
        let separators = config
            .separators
            .iter()
            .enumerate()
            .map(|(index, named)| {
                builder
                    .build(&named.spec)
                    .map(|sep| SharedSeparator::new(named.name.clone(), sep))
                    .map_err(|err| err.in_separator(index))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(separators))
    }

    pub fn len(&self) -> usize {
        self.separators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.separators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedSeparator<K>> {
        self.separators.iter()
    }

    pub fn by_name(&self, name: &str) -> Option<&SharedSeparator<K>> {
        self.separators.iter().find(|sep| sep.name() == name)
    }

    pub fn put(&self, key: &K) -> FanOutReport {
        self.fan_out(|sep| sep.put(key))
    }

    pub fn get(&self, key: &K) -> FanOutReport {
        self.fan_out(|sep| sep.get(key))
    }

    fn fan_out(
        &self,
        mut access: impl FnMut(&SharedSeparator<K>) -> Result<(), SeparatorError>,
    ) -> FanOutReport {
        let mut report = FanOutReport::default();
        for (index, sep) in self.separators.iter().enumerate() {
            match access(sep) {
                Ok(()) => report.applied += 1,
                Err(SeparatorError::Invariant(err)) => {
                    tracing::error!(separator = sep.name(), error = %err, "separator invariant violated");
                    report.failures.push((index, SeparatorError::Invariant(err)));
                }
                Err(err) => report.failures.push((index, err)),
            }
        }
        report
    }

    /// Snapshots every instance's counters into `exporter`.
    #[cfg(feature = "metrics")]
    pub fn export_metrics<E>(&self, exporter: &E)
    where
        E: MetricsExporter<SeparatorMetricsSnapshot> + ?Sized,
    {
        for sep in &self.separators {
            exporter.export(&sep.metrics_snapshot());
        }
    }

    /// Hands every instance's hot keys to `sink`, stopping at the first
    /// sink error.
    pub fn report<S>(&self, sink: &mut S) -> Result<(), S::Error>
    where
        S: HotKeySink<K> + ?Sized,
    {
        for sep in &self.separators {
            let keys = sep.hot_keys();
            tracing::debug!(separator = sep.name(), hot = keys.len(), "reporting hot keys");
            sink.write_hot_keys(sep.name(), &keys)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::builder::SeparatorSpec;
    use crate::report::MemoryHotKeySink;

    fn lru(name: &str, capacity: usize) -> SharedSeparator<u64> {
        let sep = SeparatorBuilder::new()
            .build(&SeparatorSpec::Lru { capacity })
            .unwrap();
        SharedSeparator::new(name, sep)
    }

    mod basic_behavior {
        use super::*;

        #[test]
        fn test_shared_separator_forwards_calls() {
            let sep = lru("lru", 2);
            sep.put(&1).unwrap();
            sep.put(&2).unwrap();
            assert!(sep.is_hot_key(&1));
            assert_eq!(sep.hot_keys(), vec![2, 1]);
            assert_eq!(sep.get(&9), Err(SeparatorError::NotFound));
            assert_eq!(sep.kind(), SeparatorKind::Lru);
            assert!(sep.diagnostics().starts_with("[lru] lru"));
            sep.check_invariants().unwrap();

            let resident = sep.with_separator(|inner| {
                inner.put(&3).unwrap();
                inner.len()
            });
            assert_eq!(resident, 2);
            assert!(!sep.is_hot_key(&1));
        }

        #[test]
        fn test_fan_out_isolates_failures() {
            let builder = SeparatorBuilder::new();
            let set = SeparatorSet::new(vec![
                lru("a", 4),
                SharedSeparator::new(
                    "arc",
                    builder
                        .build(&SeparatorSpec::Unimplemented(SeparatorKind::Arc))
                        .unwrap(),
                ),
                lru("b", 4),
            ]);

            let report = set.put(&7);
            assert_eq!(report.applied, 2);
            assert_eq!(
                report.failures,
                vec![(1, SeparatorError::Unimplemented(SeparatorKind::Arc))]
            );
            assert!(!report.has_invariant_failure());
            assert!(set.by_name("b").unwrap().is_hot_key(&7));
        }

        #[test]
        fn test_report_writes_each_instance() {
            let set = SeparatorSet::new(vec![lru("x", 4), lru("y", 1)]);
            set.put(&1);
            set.put(&2);

            let mut sink = MemoryHotKeySink::default();
            set.report(&mut sink).unwrap();
            assert_eq!(sink.reports["x"], vec![2, 1]);
            assert_eq!(sink.reports["y"], vec![2]);
        }
    }

    mod concurrency {
        use super::*;

        fn assert_concurrent<T: ConcurrentSeparator>() {}

        #[test]
        fn test_shared_separator_is_concurrent() {
            assert_concurrent::<SharedSeparator<u64>>();
            assert_concurrent::<SharedSeparator<Vec<u8>>>();
        }

        #[test]
        fn test_concurrent_puts_respect_capacity() {
            let set = Arc::new(SeparatorSet::new(vec![lru("lru", 16)]));
            let handles: Vec<_> = (0..4u64)
                .map(|t| {
                    let set = Arc::clone(&set);
                    thread::spawn(move || {
                        for i in 0..500u64 {
                            let report = set.put(&(t * 1_000 + i % 40));
                            assert!(report.is_clean());
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let sep = set.by_name("lru").unwrap();
            assert_eq!(sep.len(), 16);
            sep.check_invariants().unwrap();
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn test_snapshot_counts_calls() {
            let sep = lru("lru", 2);
            sep.put(&1).unwrap();
            let _ = sep.get(&5);
            sep.is_hot_key(&1);

            let snap = sep.metrics_snapshot();
            assert_eq!(snap.separator, "lru");
            assert_eq!(snap.put_calls, 1);
            assert_eq!(snap.get_not_found, 1);
            assert_eq!(snap.hot_key_hits, 1);
            assert_eq!(snap.capacity, Some(2));
        }

        #[test]
        fn test_set_exports_every_instance() {
            use crate::metrics::PrometheusTextExporter;

            let set = SeparatorSet::new(vec![lru("a", 2), lru("b", 4)]);
            set.put(&1);
            let exporter = PrometheusTextExporter::new("heatsep", Vec::new());
            set.export_metrics(&exporter);

            let text = String::from_utf8(exporter.into_inner()).unwrap();
            assert!(text.contains("heatsep_put_calls_total{separator=\"a\"} 1"));
            assert!(text.contains("heatsep_capacity{separator=\"b\"} 4"));
        }
    }
}
