use chrono::Utc;
use clap::Parser;
use roma_reconcile::aggregate::Aggregator;
use roma_reconcile::config::Config;
use roma_reconcile::io;
use roma_reconcile::reconcile::{centroids_from_regions, ProximityLinker, RegionCentroid};
use roma_reconcile::validation;
use serde::Serialize;
use std::path::PathBuf;

/// Roma Reconcile: merge gazetteer sources and assign regions
///
/// Reads normalized location records per source, merges them by id in the
/// configured source priority, assigns each location the nearest region
/// centroid and writes one sorted record set.
///
/// Examples:
///   roma --source pleiades=processed/pleiades.json --source orbis=processed/orbis.json
///   roma --source pleiades=p.json --regions processed/provinces.json --out processed/locations.json
///   roma --source pleiades=p.json --source topostext=t.json --links processed/links.json
#[derive(Parser)]
#[command(name = "roma", version, about, long_about = None)]
struct Cli {
    /// Source records as NAME=PATH (repeatable).
    #[arg(long = "source", short = 's', value_parser = parse_source, required = true)]
    sources: Vec<(String, PathBuf)>,

    /// Region records (JSON array with id, centroid_lat, centroid_lon).
    #[arg(long, short = 'r')]
    regions: Option<PathBuf>,

    /// Config file. Defaults to ~/.config/roma/config.json.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Output file for reconciled records. Prints to stdout when omitted.
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Also write cross-source proximity links to this file.
    #[arg(long)]
    links: Option<PathBuf>,

    /// Skip output validation.
    #[arg(long)]
    no_validate: bool,

    /// Debug logging.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn parse_source(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.is_empty() => {
            Ok((name.trim().to_lowercase(), PathBuf::from(path)))
        }
        _ => Err(format!("Expected NAME=PATH, got '{}'", s)),
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    generated_at: String,
    report: &'a roma_reconcile::AggregateReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<validation::ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    // ── Configuration ───────────────────────────────────────────

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| fail(e));
    init_tracing(cli.verbose || config.verbose);

    // ── Load sources ────────────────────────────────────────────

    let mut loaded = Vec::new();
    for (name, path) in &cli.sources {
        let records = io::read_records(path).unwrap_or_else(|e| fail(e));
        loaded.push((name.clone(), records));
    }
    let batches = config.select_batches(loaded).unwrap_or_else(|e| fail(e));

    let centroids: Vec<RegionCentroid> = match &cli.regions {
        Some(path) => centroids_from_regions(&io::read_regions(path).unwrap_or_else(|e| fail(e))),
        None => Vec::new(),
    };
    tracing::info!(sources = batches.len(), regions = centroids.len(), "inputs loaded");

    // ── Reconcile ───────────────────────────────────────────────

    let aggregate = Aggregator::with_filter(config.record_filter()).aggregate(batches, &centroids);

    let links = cli.links.as_ref().map(|path| {
        let linker = ProximityLinker::new(&aggregate.records, config.cell_size_deg).unwrap_or_else(|e| fail(e));
        let links = linker.links(config.link_radius_km);
        io::write_json(path, &links).unwrap_or_else(|e| fail(e));
        links.len()
    });

    let validation = (!cli.no_validate).then(|| {
        let report = validation::validate(&aggregate.records, &centroids);
        for error in report.errors() {
            tracing::warn!("validation failed: {}", error);
        }
        for warning in report.warnings() {
            tracing::warn!("validation warning: {}", warning);
        }
        report
    });

    // ── Output ──────────────────────────────────────────────────

    match &cli.out {
        Some(path) => {
            io::write_json(path, &aggregate.records).unwrap_or_else(|e| fail(e));
            let summary = Summary {
                generated_at: Utc::now().to_rfc3339(),
                report: &aggregate.report,
                validation,
                links,
            };
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{}", json),
                Err(e) => fail(e),
            }
        }
        None => match serde_json::to_string_pretty(&aggregate.records) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        },
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("roma_reconcile={level},roma={level}"));
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}
