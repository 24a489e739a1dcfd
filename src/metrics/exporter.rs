use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::MetricsExporter;
use crate::metrics::snapshot::SeparatorMetricsSnapshot;

/// Prometheus text exporter for separator metrics snapshots.
///
/// Writes the Prometheus text exposition format, one sample per line,
/// labelled with the separator name.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_sample(&self, kind: &str, name: &str, separator: &str, value: u64) {
        let name = self.metric_name(name);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{}{{separator=\"{}\"}} {}", name, separator, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<SeparatorMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &SeparatorMetricsSnapshot) {
        let sep = snapshot.separator.as_str();
        let counters = [
            ("put_calls_total", snapshot.put_calls),
            ("get_calls_total", snapshot.get_calls),
            ("get_not_found_total", snapshot.get_not_found),
            ("capacity_errors_total", snapshot.capacity_errors),
            ("unimplemented_errors_total", snapshot.unimplemented_errors),
            ("invariant_errors_total", snapshot.invariant_errors),
            ("hot_key_checks_total", snapshot.hot_key_checks),
            ("hot_key_hits_total", snapshot.hot_key_hits),
            ("hot_keys_calls_total", snapshot.hot_keys_calls),
        ];
        for (name, value) in counters {
            self.write_sample("counter", name, sep, value);
        }
        self.write_sample("gauge", "resident_keys", sep, snapshot.resident_keys as u64);
        if let Some(capacity) = snapshot.capacity {
            self.write_sample("gauge", "capacity", sep, capacity as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports_labelled_samples() {
        let exporter = PrometheusTextExporter::new("heatsep", Vec::new());
        let snapshot = SeparatorMetricsSnapshot {
            separator: "lru".to_string(),
            put_calls: 4,
            resident_keys: 2,
            capacity: Some(8),
            ..Default::default()
        };
        exporter.export(&snapshot);

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE heatsep_put_calls_total counter"));
        assert!(text.contains("heatsep_put_calls_total{separator=\"lru\"} 4"));
        assert!(text.contains("heatsep_capacity{separator=\"lru\"} 8"));
    }

    #[test]
    fn test_unbounded_separator_has_no_capacity_gauge() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&SeparatorMetricsSnapshot {
            separator: "window".to_string(),
            ..Default::default()
        });
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("resident_keys{separator=\"window\"} 0"));
        assert!(!text.contains("capacity{"));
    }
}
