//! JSON configuration for a set of heat separators.
//!
//! ```json
//! {
//!   "operationcount": 1000000,
//!   "hot_key_portion": 0.2,
//!   "heat_separators": [
//!     { "type": "lru",  "params": { "capacity": 1000 } },
//!     { "type": "lruk", "name": "lru2", "params": { "k": 2, "capacity": 1000 } }
//!   ]
//! }
//! ```
//!
//! Each entry is validated into a typed [`SeparatorSpec`]. Entries with an
//! unknown `type` are skipped with a warning and listed in
//! [`HarnessConfig::ignored`]; any other problem is a [`ConfigError`] that
//! names the entry index and field.
use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::builder::{SeparatorKind, SeparatorSpec};
use crate::ds::count_min::{CountMinSketch, MAX_SKETCH_COUNTERS};
use crate::error::ConfigError;
use crate::policy::lirs::DEFAULT_LIR_RATIO;
use crate::policy::s3_fifo::{DEFAULT_GHOST_RATIO, DEFAULT_SMALL_RATIO};
use crate::policy::w_tinylfu::WTinyLfuParams;

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "operationcount")]
    operation_count: u64,
    hot_key_portion: f64,
    #[serde(default)]
    heat_separators: Vec<RawSeparator>,
}

#[derive(Debug, Deserialize)]
struct RawSeparator {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    params: Value,
}

/// One configured separator instance.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSpec {
    /// Unique within the configuration; used for report file names.
    pub name: String,
    pub spec: SeparatorSpec,
}

/// A `heat_separators` entry that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredEntry {
    pub index: usize,
    pub kind: String,
}

/// Validated harness configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub operation_count: u64,
    /// Share of distinct keys treated as ground-truth hot, in `[0, 1]`.
    pub hot_key_portion: f64,
    pub separators: Vec<NamedSpec>,
    pub ignored: Vec<IgnoredEntry>,
}

impl HarnessConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        if !raw.hot_key_portion.is_finite() || !(0.0..=1.0).contains(&raw.hot_key_portion) {
            return Err(ConfigError::new(format!(
                "hot_key_portion must be in [0.0, 1.0], got {}",
                raw.hot_key_portion
            )));
        }

        let mut separators = Vec::with_capacity(raw.heat_separators.len());
        let mut ignored = Vec::new();
        let mut names: FxHashSet<String> = FxHashSet::default();

        for (index, entry) in raw.heat_separators.into_iter().enumerate() {
            let Some(kind) = SeparatorKind::from_tag(&entry.kind) else {
                tracing::warn!(index, kind = %entry.kind, "unknown heat separator type, skipping");
                ignored.push(IgnoredEntry {
                    index,
                    kind: entry.kind,
                });
                continue;
            };

            let empty = Map::new();
            let map = match &entry.params {
                Value::Object(map) => map,
                Value::Null => &empty,
                other => {
                    return Err(ConfigError::new(format!(
                        "heat_separators[{index}].params: expected an object, got {other}"
                    )));
                }
            };
            let spec = parse_spec(kind, &Params { index, map })?;

            let base = entry.name.unwrap_or_else(|| kind.tag().to_string());
            let name = if names.contains(&base) {
                format!("{base}_{index}")
            } else {
                base
            };
            names.insert(name.clone());
            separators.push(NamedSpec { name, spec });
        }

        tracing::debug!(
            configured = separators.len(),
            ignored = ignored.len(),
            "heat separator configuration loaded"
        );
        Ok(Self {
            operation_count: raw.operation_count,
            hot_key_portion: raw.hot_key_portion,
            separators,
            ignored,
        })
    }
}

fn parse_spec(kind: SeparatorKind, params: &Params<'_>) -> Result<SeparatorSpec, ConfigError> {
    let spec = match kind {
        SeparatorKind::Lru => SeparatorSpec::Lru {
            capacity: params.usize("capacity")?,
        },
        SeparatorKind::Lfu => SeparatorSpec::Lfu {
            capacity: params.usize("capacity")?,
            min_freq: params.opt_u64("min_freq")?.unwrap_or(1),
        },
        SeparatorKind::LruK => {
            let k = params.u64("k")?;
            if k == 0 {
                return Err(ConfigError::at(params.index, "k", "must be at least 1"));
            }
            SeparatorSpec::LruK {
                k,
                capacity: params.usize("capacity")?,
            }
        }
        SeparatorKind::Window => {
            let window_ms = match params.opt_u64("window_size_ms")? {
                Some(ms) => ms,
                None => params
                    .opt_u64("window_size")?
                    .ok_or_else(|| ConfigError::at(params.index, "window_size_ms", "missing"))?,
            };
            SeparatorSpec::Window {
                window_ms,
                threshold: params.positive_u64("threshold")?,
            }
        }
        SeparatorKind::SketchWindow => {
            let epsilon = params.f64("epsilon")?;
            let delta = params.f64("delta")?;
            let width = CountMinSketch::width_for(epsilon)
                .map_err(|e| ConfigError::at(params.index, "epsilon", e.message()))?;
            let depth = CountMinSketch::depth_for(delta)
                .map_err(|e| ConfigError::at(params.index, "delta", e.message()))?;
            if width.saturating_mul(depth) > MAX_SKETCH_COUNTERS {
                return Err(ConfigError::at(
                    params.index,
                    "epsilon",
                    format!(
                        "sketch of {width}x{depth} exceeds the {MAX_SKETCH_COUNTERS} counter budget"
                    ),
                ));
            }
            SeparatorSpec::SketchWindow {
                window_size: params.usize("window_size")?,
                epsilon,
                delta,
                threshold: params.positive_u64("threshold")?,
                enable_lru: params.bool("enable_lru")?,
            }
        }
        SeparatorKind::WTinyLfu => {
            let defaults = WTinyLfuParams::default();
            SeparatorSpec::WTinyLfu {
                capacity: params.usize("capacity")?,
                params: WTinyLfuParams {
                    window_ratio: params
                        .opt_f64("window_ratio")?
                        .unwrap_or(defaults.window_ratio),
                    protected_ratio: params
                        .opt_f64("protected_ratio")?
                        .unwrap_or(defaults.protected_ratio),
                    sample_size: params.opt_u64("sample_size")?,
                    seed: params.opt_u64("seed")?.unwrap_or(defaults.seed),
                },
            }
        }
        SeparatorKind::Lirs => SeparatorSpec::Lirs {
            capacity: params.usize("capacity")?,
            lir_ratio: params.opt_f64("lir_ratio")?.unwrap_or(DEFAULT_LIR_RATIO),
            max_nonresident: params.opt_usize("max_nonresident")?,
        },
        SeparatorKind::S3Fifo => SeparatorSpec::S3Fifo {
            capacity: params.usize("capacity")?,
            small_ratio: params.opt_f64("small_ratio")?.unwrap_or(DEFAULT_SMALL_RATIO),
            ghost_ratio: params.opt_f64("ghost_ratio")?.unwrap_or(DEFAULT_GHOST_RATIO),
        },
        SeparatorKind::Arc => {
            params.usize("capacity")?;
            SeparatorSpec::Unimplemented(kind)
        }
        SeparatorKind::HotRing | SeparatorKind::HeapTopK => SeparatorSpec::Unimplemented(kind),
    };
    Ok(spec)
}

/// Typed accessors over one entry's `params` object.
struct Params<'a> {
    index: usize,
    map: &'a Map<String, Value>,
}

impl Params<'_> {
    fn present(&self, field: &str) -> Option<&Value> {
        self.map.get(field).filter(|value| !value.is_null())
    }

    fn missing(&self, field: &str) -> ConfigError {
        ConfigError::at(self.index, field, "missing")
    }

    fn opt_u64(&self, field: &str) -> Result<Option<u64>, ConfigError> {
        match self.present(field) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                ConfigError::at(
                    self.index,
                    field,
                    format!("expected a non-negative integer, got {value}"),
                )
            }),
        }
    }

    fn u64(&self, field: &str) -> Result<u64, ConfigError> {
        self.opt_u64(field)?.ok_or_else(|| self.missing(field))
    }

    fn positive_u64(&self, field: &str) -> Result<u64, ConfigError> {
        match self.u64(field)? {
            0 => Err(ConfigError::at(self.index, field, "must be at least 1")),
            n => Ok(n),
        }
    }

    fn opt_usize(&self, field: &str) -> Result<Option<usize>, ConfigError> {
        self.opt_u64(field)?
            .map(|n| {
                usize::try_from(n).map_err(|_| ConfigError::at(self.index, field, "out of range"))
            })
            .transpose()
    }

    fn usize(&self, field: &str) -> Result<usize, ConfigError> {
        self.opt_usize(field)?.ok_or_else(|| self.missing(field))
    }

    fn opt_f64(&self, field: &str) -> Result<Option<f64>, ConfigError> {
        match self.present(field) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                ConfigError::at(self.index, field, format!("expected a number, got {value}"))
            }),
        }
    }

    fn f64(&self, field: &str) -> Result<f64, ConfigError> {
        self.opt_f64(field)?.ok_or_else(|| self.missing(field))
    }

    fn bool(&self, field: &str) -> Result<bool, ConfigError> {
        match self.present(field) {
            None => Err(self.missing(field)),
            Some(value) => value.as_bool().ok_or_else(|| {
                ConfigError::at(self.index, field, format!("expected a boolean, got {value}"))
            }),
        }
    }
}
