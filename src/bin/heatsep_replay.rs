//! Replays an access trace through a configured set of heat separators.
//!
//! Run with: cargo run --release --bin heatsep-replay -- \
//!     --config separator_config.json --trace trace.csv --out reports --threads 4
//!
//! Writes `hotkeys_<name>.csv` per separator and `key_stats_hotkeys.csv` with
//! the exact top keys, then logs precision/recall of every separator against
//! the exact list.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use heatsep::builder::SeparatorBuilder;
use heatsep::config::HarnessConfig;
use heatsep::report::{CsvHotKeySink, KeyStats, Overlap};
use heatsep::sync::SeparatorSet;
use heatsep::trace::{self, Key, TraceOp, TraceReader};

#[derive(Debug, Parser)]
#[command(name = "heatsep-replay", about = "Replay a cache trace through heat separators")]
struct Cli {
    /// Separator configuration (JSON).
    #[arg(short, long)]
    config: PathBuf,

    /// Trace file: `op,key` or Twitter cache-trace CSV lines.
    #[arg(short, long)]
    trace: PathBuf,

    /// Directory for the report files.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Worker threads feeding the separators.
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Abort on the first malformed trace line instead of skipping it.
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = HarnessConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    for ignored in &config.ignored {
        warn!(index = ignored.index, kind = %ignored.kind, "separator type not supported, skipped");
    }
    let set: SeparatorSet<Key> = SeparatorSet::from_config(&config, &SeparatorBuilder::new())?;
    info!(separators = set.len(), "separators ready");

    let ops = load_trace(&cli, config.operation_count)?;
    info!(operations = ops.len(), threads = cli.threads, "replaying trace");

    let started = Instant::now();
    let stats = replay(&set, &ops, cli.threads.max(1));
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        distinct_keys = stats.len(),
        "replay finished"
    );

    fs::create_dir_all(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?;
    let mut sink = CsvHotKeySink::new(&cli.out);
    let truth = stats.hot_keys(config.hot_key_portion);
    sink.write_ground_truth(&truth)
        .context("writing ground-truth hot keys")?;
    set.report(&mut sink).context("writing hot-key reports")?;
    #[cfg(feature = "metrics")]
    write_metrics(&set, &cli.out)?;

    for sep in set.iter() {
        let overlap = Overlap::compute(&truth, &sep.hot_keys());
        info!(
            separator = sep.name(),
            reported = overlap.reported,
            matched = overlap.matched,
            precision = overlap.precision(),
            recall = overlap.recall(),
            "hot-key overlap"
        );
    }
    Ok(())
}

#[cfg(feature = "metrics")]
fn write_metrics(set: &SeparatorSet<Key>, out: &std::path::Path) -> Result<()> {
    use std::io::Write;

    use heatsep::metrics::PrometheusTextExporter;

    let path = out.join("metrics.prom");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let exporter = PrometheusTextExporter::new("heatsep", std::io::BufWriter::new(file));
    set.export_metrics(&exporter);
    exporter.into_inner().flush()?;
    info!(path = %path.display(), "metrics written");
    Ok(())
}

fn load_trace(cli: &Cli, limit: u64) -> Result<Vec<TraceOp>> {
    let file = File::open(&cli.trace).with_context(|| format!("opening {}", cli.trace.display()))?;
    let mut ops = Vec::new();
    let mut skipped = 0u64;
    for result in TraceReader::new(BufReader::new(file)) {
        match result {
            Ok(op) => ops.push(op),
            Err(err) if !cli.strict => {
                skipped += 1;
                tracing::debug!(error = %err, "skipping trace line");
            }
            Err(err) => return Err(err.into()),
        }
        if limit > 0 && ops.len() as u64 >= limit {
            break;
        }
    }
    if skipped > 0 {
        warn!(skipped, "malformed trace lines skipped");
    }
    Ok(ops)
}

/// Splits the trace into contiguous chunks, one per worker, while the
/// exact statistics are kept on the calling thread in trace order.
fn replay(set: &SeparatorSet<Key>, ops: &[TraceOp], threads: usize) -> KeyStats<Key> {
    let chunk = ops.len().div_ceil(threads).max(1);
    thread::scope(|scope| {
        for part in ops.chunks(chunk) {
            scope.spawn(move || {
                for op in part {
                    let report = trace::feed(op, set);
                    if report.has_invariant_failure() {
                        tracing::error!(key = ?op.key(), "separator state corrupted");
                    }
                }
            });
        }

        let mut stats = KeyStats::new();
        for op in ops {
            trace::record(op, &mut stats);
        }
        stats
    })
}
