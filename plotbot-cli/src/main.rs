//! Plotbot CLI: acquisition, snapshot, and alignment commands.
//!
//! Commands:
//! - `fetch`: acquire data types over a time range and report what arrived
//! - `snapshot save`: acquire data types over one or more ranges, then save
//! - `snapshot load`: restore a snapshot and report what was restored
//! - `snapshot info`: list a snapshot's entries without restoring them
//! - `align`: project one field onto another data type's time grid, as CSV

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use plotbot_core::align::AlignMethod;
use plotbot_core::domain::{DataTypeKey, TimeRange};
use plotbot_core::session::Session;
use plotbot_core::snapshot::{
    inspect_snapshot, load_snapshot, snapshot_file_name, Compression, EntryKind, LoadOptions,
    SaveOptions,
};
use plotbot_runner::{
    align_field, AcquisitionAction, AlignedField, FieldRef, KeyOutcome, Orchestrator,
    PlotbotConfig,
};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "plotbot",
    about = "Plotbot: PSP data cache, snapshots, and cross-instrument alignment"
)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: never use the download source.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Log verbosity: -v for debug, -vv for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire data types over a time range.
    Fetch {
        /// Data type keys (e.g., mag_RTN_4sa spi_sf00_l3_mom ham).
        #[arg(required = true)]
        keys: Vec<String>,

        /// Range start (e.g., 2023-09-28/06:00:00).
        #[arg(long)]
        start: String,

        /// Range end.
        #[arg(long)]
        end: String,

        /// Restore this snapshot before acquiring.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Snapshot commands.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
    /// Align a field onto another data type's timestamps and write CSV.
    Align {
        /// Field to align, as <data type>.<field> (e.g., spi_sf00_l3_mom.density).
        source: String,

        /// Data type whose time grid is the target (e.g., ham).
        target: String,

        /// Range start.
        #[arg(long)]
        start: String,

        /// Range end.
        #[arg(long)]
        end: String,

        #[arg(long, value_enum, default_value_t = MethodArg::Tolerance)]
        method: MethodArg,

        /// Restore this snapshot before acquiring.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Output CSV path. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Acquire data types over the given ranges, then save them.
    Save {
        #[arg(required = true)]
        keys: Vec<String>,

        /// Range to acquire first, as START,END. Repeatable.
        #[arg(long = "range")]
        ranges: Vec<String>,

        /// Keep only samples inside START,END.
        #[arg(long)]
        filter: Option<String>,

        /// File label; the path is {snapshot_dir}/{label}.pbsnap[.zst].
        #[arg(long, default_value = "snapshot")]
        label: String,

        /// Explicit output path (overrides --label).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Store every instance whole, even across large time gaps.
        #[arg(long, default_value_t = false)]
        no_split: bool,

        #[arg(long, value_enum)]
        compression: Option<CompressionArg>,
    },
    /// Restore a snapshot and report what it held.
    Load {
        path: PathBuf,

        /// Restore only these data types.
        #[arg(long = "only")]
        only: Vec<String>,

        /// Merge segments into existing data instead of resetting first.
        #[arg(long, default_value_t = false)]
        no_reset: bool,
    },
    /// List a snapshot's entries.
    Info {
        path: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Nearest sample, NaN beyond the first target spacing.
    Tolerance,
    /// Nearest sample at any distance.
    Nearest,
    /// Sparse events onto their nearest target slot.
    Scatter,
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Zstd,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = load_config(cli.config.as_deref(), cli.offline)?;

    match cli.command {
        Commands::Fetch {
            keys,
            start,
            end,
            snapshot,
        } => run_fetch(&config, &keys, &start, &end, snapshot.as_deref()),
        Commands::Snapshot { action } => match action {
            SnapshotAction::Save {
                keys,
                ranges,
                filter,
                label,
                output,
                no_split,
                compression,
            } => run_snapshot_save(
                &config,
                &keys,
                &ranges,
                filter.as_deref(),
                output.unwrap_or_else(|| default_snapshot_path(&config, &label, compression)),
                no_split,
                compression,
            ),
            SnapshotAction::Load {
                path,
                only,
                no_reset,
            } => run_snapshot_load(&path, &only, no_reset),
            SnapshotAction::Info { path, json } => run_snapshot_info(&path, json),
        },
        Commands::Align {
            source,
            target,
            start,
            end,
            method,
            snapshot,
            output,
        } => run_align(
            &config,
            &source,
            &target,
            &start,
            &end,
            method,
            snapshot.as_deref(),
            output.as_deref(),
        ),
    }
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stderr);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(LevelFilter::Info),
        1 => builder.filter_level(LevelFilter::Debug),
        _ => builder.filter_level(LevelFilter::Trace),
    };
    builder.init();
}

fn load_config(path: Option<&Path>, offline: bool) -> Result<PlotbotConfig> {
    let mut config = match path {
        Some(path) => PlotbotConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PlotbotConfig::default(),
    };
    config.offline |= offline;
    Ok(config)
}

fn run_fetch(
    config: &PlotbotConfig,
    keys: &[String],
    start: &str,
    end: &str,
    snapshot: Option<&Path>,
) -> Result<()> {
    let keys = parse_keys(keys)?;
    let range = TimeRange::parse(start, end)?;
    let mut session = Session::new();
    if let Some(path) = snapshot {
        restore(&mut session, path, &LoadOptions::default())?;
    }

    let orchestrator = Orchestrator::from_config(config);
    let outcomes = orchestrator.acquire_many(&mut session, &keys, &range);
    print_outcomes(&outcomes);

    if outcomes.iter().any(|o| o.result.is_err()) {
        std::process::exit(1);
    }
    Ok(())
}

fn run_snapshot_save(
    config: &PlotbotConfig,
    keys: &[String],
    ranges: &[String],
    filter: Option<&str>,
    path: PathBuf,
    no_split: bool,
    compression: Option<CompressionArg>,
) -> Result<()> {
    let keys = parse_keys(keys)?;
    let ranges = ranges
        .iter()
        .map(|r| parse_range_arg(r))
        .collect::<Result<Vec<_>>>()?;
    let options = SaveOptions {
        keys: Some(keys.clone()),
        time_filter: filter.map(parse_range_arg).transpose()?,
        auto_split: config.auto_split && !no_split,
        compression: resolve_compression(config, compression),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut session = Session::new();
    let orchestrator = Orchestrator::from_config(config);
    let populated =
        orchestrator.save_with_population(&mut session, &keys, &ranges, &options, &path)?;
    print_outcomes(&populated.acquired);

    let report = &populated.save;
    println!();
    println!("Saved {} data type(s) to {}", report.written.len(), report.path.display());
    for (key, n) in &report.segmented {
        println!("  {key}: {n} segments");
    }
    for key in &report.dropped_empty {
        println!("  {key}: empty after filtering, not saved");
    }
    for key in &report.missing {
        println!("  {key}: nothing cached, not saved");
    }
    println!("Size: {}", format_size(report.bytes));
    Ok(())
}

fn run_snapshot_load(path: &Path, only: &[String], no_reset: bool) -> Result<()> {
    let options = LoadOptions {
        classes: if only.is_empty() {
            None
        } else {
            Some(parse_keys(only)?)
        },
        merge_segments: !no_reset,
    };
    let mut session = Session::new();
    restore(&mut session, path, &options)?;

    println!();
    println!("{:<18} {:>10}  Coverage", "Data type", "Samples");
    println!("{}", "-".repeat(72));
    for key in session.cubby.keys() {
        let samples = session.cubby.grab(key).map_or(0, |inst| inst.len());
        let coverage = session
            .tracker
            .get_imported_range(key)
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        println!("{:<18} {:>10}  {}", key.as_str(), samples, coverage);
    }
    Ok(())
}

fn run_snapshot_info(path: &Path, json: bool) -> Result<()> {
    let summary = inspect_snapshot(path).with_context(|| format!("reading {}", path.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Snapshot: {}", path.display());
    println!("Created:  {}", summary.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Compressed: {}", if summary.compressed { "zstd" } else { "no" });
    println!();
    println!("{:<32} {:<12} {:>9}  Bounds", "Entry", "Kind", "Samples");
    println!("{}", "-".repeat(96));
    for entry in &summary.entries {
        let kind = match entry.kind {
            EntryKind::Whole => "whole".to_string(),
            EntryKind::Segment(n) => format!("segment {n}"),
            EntryKind::Meta { segment_count } => format!("meta ({segment_count})"),
        };
        let bounds = entry
            .bounds
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        println!("{:<32} {:<12} {:>9}  {}", entry.name, kind, entry.samples, bounds);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_align(
    config: &PlotbotConfig,
    source: &str,
    target: &str,
    start: &str,
    end: &str,
    method: MethodArg,
    snapshot: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let source: FieldRef = source.parse()?;
    let target: DataTypeKey = target.parse()?;
    let range = TimeRange::parse(start, end)?;
    let method = match method {
        MethodArg::Tolerance => config.alignment.tolerance_method(),
        MethodArg::Nearest => AlignMethod::NearestIndex,
        MethodArg::Scatter => config.alignment.scatter_method(),
    };

    let mut session = Session::new();
    if let Some(path) = snapshot {
        restore(&mut session, path, &LoadOptions::default())?;
    }
    let orchestrator = Orchestrator::from_config(config);
    for key in [source.key, target] {
        orchestrator
            .acquire(&mut session, key, &range)
            .with_context(|| format!("acquiring {key}"))?;
    }

    let aligned = align_field(&session, &source, target, method)?;
    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    write_aligned_csv(out, &aligned)?;
    Ok(())
}

/// Same layout the CSV directory source reads: `time` plus one column per
/// scalar, `{field}_{i}` per component of wider fields.
fn write_aligned_csv(out: impl Write, aligned: &AlignedField) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    let name = &aligned.source.field;
    let width = aligned.field.width();
    let mut header = vec!["time".to_string()];
    if width == 1 {
        header.push(name.clone());
    } else {
        header.extend((0..width).map(|i| format!("{name}_{i}")));
    }
    writer.write_record(&header)?;

    for (i, t) in aligned.times.iter().enumerate() {
        let mut record = vec![t.format("%Y-%m-%d/%H:%M:%S%.6f").to_string()];
        record.extend(aligned.field.row(i).iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn restore(session: &mut Session, path: &Path, options: &LoadOptions) -> Result<()> {
    let report = load_snapshot(session, path, options)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    println!(
        "Restored {} data type(s) from {}",
        report.restored.len(),
        path.display()
    );
    for name in &report.empty {
        println!("  WARNING: {name} held no usable data");
    }
    for key in &report.failed {
        println!("  WARNING: {key} was rejected (see log)");
    }
    for name in &report.skipped {
        println!("  skipped {name}");
    }
    Ok(())
}

fn print_outcomes(outcomes: &[KeyOutcome]) {
    println!("{:<18} {:<10} {:>9}  Recorded", "Data type", "Action", "Samples");
    println!("{}", "-".repeat(72));
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                let action = match report.action {
                    AcquisitionAction::Cached => "cached",
                    AcquisitionAction::Import => "import",
                    AcquisitionAction::Download { .. } => "download",
                    AcquisitionAction::Unavailable => "-",
                };
                let recorded = report
                    .recorded
                    .map_or_else(|| "-".to_string(), |r| r.to_string());
                println!(
                    "{:<18} {:<10} {:>9}  {}",
                    outcome.key.as_str(),
                    action,
                    report.fetched,
                    recorded
                );
            }
            Err(e) => eprintln!("Error for {} over {}: {e}", outcome.key, outcome.range),
        }
    }
}

fn parse_keys(keys: &[String]) -> Result<Vec<DataTypeKey>> {
    keys.iter()
        .map(|k| k.parse::<DataTypeKey>().map_err(anyhow::Error::from))
        .collect()
}

fn parse_range_arg(s: &str) -> Result<TimeRange> {
    let Some((start, end)) = s.split_once(',') else {
        bail!("expected START,END, got '{s}'");
    };
    Ok(TimeRange::parse(start, end)?)
}

fn resolve_compression(config: &PlotbotConfig, arg: Option<CompressionArg>) -> Compression {
    match arg {
        None => config.compression(),
        Some(CompressionArg::None) => Compression::None,
        Some(CompressionArg::Zstd) => Compression::Zstd {
            level: config.zstd_level,
        },
    }
}

fn default_snapshot_path(
    config: &PlotbotConfig,
    label: &str,
    compression: Option<CompressionArg>,
) -> PathBuf {
    config
        .snapshot_dir
        .join(snapshot_file_name(label, resolve_compression(config, compression)))
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
