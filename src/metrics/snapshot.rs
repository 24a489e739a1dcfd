#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeparatorMetricsSnapshot {
    pub separator: String,

    pub put_calls: u64,
    pub get_calls: u64,
    pub get_not_found: u64,

    pub capacity_errors: u64,
    pub unimplemented_errors: u64,
    pub invariant_errors: u64,

    pub hot_key_checks: u64,
    pub hot_key_hits: u64,
    pub hot_keys_calls: u64,

    // gauges captured at snapshot time
    pub resident_keys: usize,
    pub capacity: Option<usize>,
}
