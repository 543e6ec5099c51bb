use anyhow::Context;
use clap::Parser;
use jass_elo::config::EloConfig;
use jass_elo::ledger::WriteMode;
use jass_elo::pipeline::{self, RunMode, RunOptions};
use jass_elo::store::JsonStore;
use jass_elo::summary;
use std::path::PathBuf;

/// Recomputes the chronological Elo rating ledger from every completed
/// session and tournament passe in the store.
///
/// Without `--confirm` the run is a dry-run: every update is computed and
/// previewed, nothing is written.
#[derive(Debug, Parser)]
#[command(name = "backfill", version)]
struct Args {
    /// Perform the writes. The default is a dry-run preview.
    #[arg(long)]
    confirm: bool,

    /// Override the delta scale constant.
    #[arg(long = "K", value_name = "FLOAT")]
    k: Option<f64>,

    /// Override the expected-score logistic scale constant.
    #[arg(long, value_name = "FLOAT")]
    scale: Option<f64>,

    /// Override the rating new players start at.
    #[arg(long, value_name = "FLOAT")]
    default_rating: Option<f64>,

    /// Named historical constant set: live, classic, legacy, or gentle.
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,

    /// json5 file holding { k, scale, default_rating }.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Restrict the run to one group.
    #[arg(long, value_name = "GROUP_ID")]
    group: Option<String>,

    /// Process at most N events of the ordered sequence.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Append the events as new instead of recomputing the full history.
    #[arg(long)]
    incremental: bool,

    /// Number of events shown in the dry-run preview.
    #[arg(long, default_value_t = 20, value_name = "N")]
    preview: usize,

    /// Data directory of the JSON document store.
    #[arg(long, default_value = "data", value_name = "PATH")]
    data_dir: PathBuf,

    /// Also write the resulting leaderboard to this CSV file.
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

/// Flag overrides are applied on top of the preset/file/default constants,
/// then validated as a whole; a bad set aborts before any event is read.
fn resolve_config(args: &Args) -> anyhow::Result<EloConfig> {
    let mut config = if let Some(path) = &args.config {
        EloConfig::from_file(path)?
    } else if let Some(name) = &args.preset {
        EloConfig::preset(name)?
    } else {
        EloConfig::default()
    };
    if let Some(k) = args.k {
        config.k = k;
    }
    if let Some(scale) = args.scale {
        config.scale = scale;
    }
    if let Some(default_rating) = args.default_rating {
        config.default_rating = default_rating;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = resolve_config(&args)?;
    tracing::info!(
        "Elo constants: K={}, scale={}, default rating={}",
        config.k,
        config.scale,
        config.default_rating,
    );

    let mut store = JsonStore::open(&args.data_dir)
        .with_context(|| format!("opening store at {}", args.data_dir.display()))?;

    let options = RunOptions {
        mode: if args.confirm { RunMode::Commit } else { RunMode::DryRun },
        write_mode: if args.incremental {
            WriteMode::Incremental
        } else {
            WriteMode::Backfill
        },
        group: args.group.clone(),
        limit: args.limit,
        preview: args.preview,
    };
    let report = pipeline::run(&mut store, &config, &options).context("rating run failed")?;

    let rows = summary::make_leaderboard(&report.snapshots);
    summary::log_leaderboard(&rows);
    if let Some(path) = &args.export {
        summary::write_csv(&rows, path)
            .with_context(|| format!("writing leaderboard to {}", path.display()))?;
        tracing::info!("Leaderboard written to {}", path.display());
    }

    if report.events_dropped > 0 {
        tracing::warn!(
            "{} malformed events were dropped; see warnings above",
            report.events_dropped
        );
    }
    if !report.committed {
        tracing::info!("Dry-run: nothing was written. Re-run with --confirm to apply.");
    }
    Ok(())
}
