//! Host-side reporting: hot-key sinks, exact key statistics and overlap
//! scoring between a policy's report and the ground truth.
//!
//! ```text
//!   access stream ──► KeyStats (exact counts) ──► hot_keys(portion) ─┐
//!              └────► SeparatorSet ──► hot_keys() per instance ──────┼──► Overlap
//!                                              │                     │
//!                                              ▼                     ▼
//!                                   hotkeys_<name>.csv     key_stats_hotkeys.csv
//! ```
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs::File;
use std::hash::Hash;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

/// File name for the ground-truth hot-key list.
pub const GROUND_TRUTH_FILE: &str = "key_stats_hotkeys.csv";

/// Destination for per-instance hot-key reports.
pub trait HotKeySink<K> {
    type Error;

    fn write_hot_keys(&mut self, name: &str, keys: &[K]) -> Result<(), Self::Error>;
}

/// Writes `hotkeys_<name>.csv` files, one raw key per line, no header.
#[derive(Debug, Clone)]
pub struct CsvHotKeySink {
    dir: PathBuf,
}

impl CsvHotKeySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("hotkeys_{name}.csv"))
    }

    /// Writes the ground-truth list to [`GROUND_TRUTH_FILE`].
    pub fn write_ground_truth<K: AsRef<[u8]>>(&self, keys: &[K]) -> io::Result<PathBuf> {
        let path = self.dir.join(GROUND_TRUTH_FILE);
        write_lines(&path, keys)?;
        Ok(path)
    }
}

fn write_lines<K: AsRef<[u8]>>(path: &Path, keys: &[K]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for key in keys {
        out.write_all(key.as_ref())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

impl<K: AsRef<[u8]>> HotKeySink<K> for CsvHotKeySink {
    type Error = io::Error;

    fn write_hot_keys(&mut self, name: &str, keys: &[K]) -> io::Result<()> {
        let path = self.path_for(name);
        write_lines(&path, keys)?;
        tracing::info!(path = %path.display(), keys = keys.len(), "hot keys written");
        Ok(())
    }
}

/// Keeps reports in memory, keyed by instance name.
#[derive(Debug, Clone)]
pub struct MemoryHotKeySink<K> {
    pub reports: HashMap<String, Vec<K>>,
}

impl<K> Default for MemoryHotKeySink<K> {
    fn default() -> Self {
        Self {
            reports: HashMap::new(),
        }
    }
}

impl<K: Clone> HotKeySink<K> for MemoryHotKeySink<K> {
    type Error = Infallible;

    fn write_hot_keys(&mut self, name: &str, keys: &[K]) -> Result<(), Infallible> {
        self.reports.insert(name.to_string(), keys.to_vec());
        Ok(())
    }
}

/// Exact per-key access counts.
#[derive(Debug, Clone)]
pub struct KeyStats<K> {
    counts: FxHashMap<K, u64>,
}

impl<K> Default for KeyStats<K> {
    fn default() -> Self {
        Self {
            counts: FxHashMap::default(),
        }
    }
}

impl<K> KeyStats<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &K) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.clone(), 1);
            }
        }
    }

    /// Drops `key` from the statistics (a delete in the trace).
    pub fn remove(&mut self, key: &K) -> bool {
        self.counts.remove(key).is_some()
    }

    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total_accesses(&self) -> u64 {
        self.counts.values().sum()
    }

    /// `(key, count)` pairs, most accessed first; ties by key.
    pub fn ranked(&self) -> Vec<(K, u64)>
    where
        K: Ord,
    {
        let mut ranked: Vec<(K, u64)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// The top `floor(n * portion) + 1` keys by count, capped at `n`.
    pub fn hot_keys(&self, portion: f64) -> Vec<K>
    where
        K: Ord,
    {
        let n = self.counts.len();
        let take = hot_key_count(n, portion);
        self.ranked()
            .into_iter()
            .take(take)
            .map(|(key, _)| key)
            .collect()
    }
}

/// Size of the ground-truth hot set for `n` distinct keys.
pub fn hot_key_count(n: usize, portion: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let portion = portion.clamp(0.0, 1.0);
    ((n as f64 * portion) as usize + 1).min(n)
}

/// Agreement between a ground-truth hot set and a policy's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub truth: usize,
    pub reported: usize,
    pub matched: usize,
}

impl Overlap {
    pub fn compute<K: Eq + Hash>(truth: &[K], reported: &[K]) -> Self {
        let truth_set: FxHashSet<&K> = truth.iter().collect();
        let reported_set: FxHashSet<&K> = reported.iter().collect();
        let matched = reported_set
            .iter()
            .filter(|key| truth_set.contains(*key))
            .count();
        Self {
            truth: truth_set.len(),
            reported: reported_set.len(),
            matched,
        }
    }

    /// Share of reported keys that are truly hot; 0 for an empty report.
    pub fn precision(&self) -> f64 {
        if self.reported == 0 {
            0.0
        } else {
            self.matched as f64 / self.reported as f64
        }
    }

    /// Share of truly hot keys that were reported; 0 for an empty truth set.
    pub fn recall(&self) -> f64 {
        if self.truth == 0 {
            0.0
        } else {
            self.matched as f64 / self.truth as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod basic_behavior {
        use super::*;

        #[test]
        fn test_key_stats_ranking_and_portion() {
            let mut stats = KeyStats::new();
            for key in ["a", "b", "a", "c", "a", "b", "d"] {
                stats.record(&key);
            }
            assert_eq!(stats.len(), 4);
            assert_eq!(stats.total_accesses(), 7);
            assert_eq!(
                stats.ranked(),
                vec![("a", 3), ("b", 2), ("c", 1), ("d", 1)]
            );
            // floor(4 * 0.25) + 1 = 2
            assert_eq!(stats.hot_keys(0.25), vec!["a", "b"]);
            assert_eq!(stats.hot_keys(1.0).len(), 4);
        }

        #[test]
        fn test_delete_removes_statistics() {
            let mut stats = KeyStats::new();
            stats.record(&1u32);
            stats.record(&1u32);
            assert!(stats.remove(&1));
            assert_eq!(stats.count(&1), 0);
            assert!(!stats.remove(&1));
        }

        #[test]
        fn test_overlap_precision_recall() {
            let overlap = Overlap::compute(&["a", "b", "c", "d"], &["a", "b", "z"]);
            assert_eq!(overlap.matched, 2);
            assert!((overlap.precision() - 2.0 / 3.0).abs() < 1e-9);
            assert!((overlap.recall() - 0.5).abs() < 1e-9);
        }

        #[test]
        fn test_csv_sink_writes_one_key_per_line() {
            let dir = tempfile::tempdir().unwrap();
            let mut sink = CsvHotKeySink::new(dir.path());
            let keys: Vec<Vec<u8>> = vec![b"user1".to_vec(), b"user2".to_vec()];
            sink.write_hot_keys("lru", keys.as_slice()).unwrap();

            let text = std::fs::read_to_string(dir.path().join("hotkeys_lru.csv")).unwrap();
            assert_eq!(text, "user1\nuser2\n");

            let truth = sink.write_ground_truth(&["k"]).unwrap();
            assert_eq!(std::fs::read_to_string(truth).unwrap(), "k\n");
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_hot_key_count_bounds() {
            assert_eq!(hot_key_count(0, 0.5), 0);
            assert_eq!(hot_key_count(10, 0.0), 1);
            assert_eq!(hot_key_count(10, 1.0), 10);
            assert_eq!(hot_key_count(3, 0.99), 3);
        }

        #[test]
        fn test_empty_overlap_is_zero() {
            let overlap = Overlap::compute::<u32>(&[], &[]);
            assert_eq!(overlap.precision(), 0.0);
            assert_eq!(overlap.recall(), 0.0);
        }

        #[test]
        fn test_empty_report_writes_empty_file() {
            let dir = tempfile::tempdir().unwrap();
            let mut sink = CsvHotKeySink::new(dir.path());
            HotKeySink::<String>::write_hot_keys(&mut sink, "empty", &[]).unwrap();
            let text = std::fs::read_to_string(sink.path_for("empty")).unwrap();
            assert!(text.is_empty());
        }
    }
}
