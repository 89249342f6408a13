//! Portfolio report CLI: reads product and lifecycle history snapshots and
//! prints the full analytics snapshot as JSON.
//!
//! Logging defaults to warnings; `RUST_LOG` overrides `-v`/`-q`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use portfolio_lifecycle::analytics::filter::SnapshotFilter;
use portfolio_lifecycle::compute_filtered_snapshot;
use portfolio_lifecycle::config::{load_config, AnalyticsConfig};
use portfolio_lifecycle::ingest::{parse_history, parse_products};
use portfolio_lifecycle::types::{LifecycleStage, Segment};

#[derive(Parser, Debug)]
#[command(name = "portfolio-report")]
#[command(about = "Lifecycle analytics for a product portfolio snapshot")]
#[command(version)]
struct Cli {
    /// Products snapshot (JSON array)
    products: PathBuf,

    /// Lifecycle history snapshot (JSON array)
    history: PathBuf,

    /// Analytics thresholds (JSON); defaults apply when omitted
    config: Option<PathBuf>,

    /// Only analyse this business segment
    #[arg(long, value_parser = parse_segment)]
    segment: Option<Segment>,

    /// Only analyse this lifecycle stage
    #[arg(long, value_parser = parse_stage)]
    stage: Option<LifecycleStage>,

    /// Only analyse launches and stage changes from the last N days
    #[arg(long)]
    since_days: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    fn filter(&self) -> SnapshotFilter {
        SnapshotFilter {
            segment: self.segment,
            stage: self.stage,
            since_days: self.since_days,
        }
    }
}

fn parse_segment(raw: &str) -> Result<Segment, String> {
    Segment::parse(raw).ok_or_else(|| format!("unknown segment '{}'", raw))
}

fn parse_stage(raw: &str) -> Result<LifecycleStage, String> {
    LifecycleStage::parse(raw).ok_or_else(|| format!("unknown lifecycle stage '{}'", raw))
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let products = parse_products(&read(&cli.products)?)?;
    let history = parse_history(&read(&cli.history)?)?;
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalyticsConfig::default(),
    };
    log::info!(
        "Loaded {} products and {} history records",
        products.len(),
        history.len()
    );

    let snapshot =
        compute_filtered_snapshot(&products, &history, &cli.filter(), Utc::now(), &config);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
