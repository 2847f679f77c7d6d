//! CLI entry point for the transit map pipeline.
//!
//! Provides subcommands for building line paths, polling vehicle positions,
//! and listing lines and stops from the static schedule.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_map::{
    catalog::{self, BBox},
    config::{Config, parse_route_kinds},
    fetch::{BasicClient, RetryOptions},
    output::{append_records, write_json},
    realtime::fetch_vehicle_positions,
    reconcile::reconcile,
    schedule::{ScheduleStore, load_schedule},
    snapshot::{SnapshotHandle, build_snapshot},
    stats::PollStats,
    vehicles::{Vehicle, VehicleRow, enrich_vehicles},
};

#[derive(Parser)]
#[command(name = "transit_map")]
#[command(about = "Build transit line geometry and live vehicle positions from GTFS feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one drawable path per line and write them as JSON
    Paths {
        /// File to write to (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Gzip compress the output file
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Only let tram lines use OSM geometry (overrides OSM_ROUTE_KINDS)
        #[arg(long, default_value_t = false)]
        trams_only_osm: bool,

        /// Keep running and rebuild every SCHEDULE_REFRESH_INTERVAL
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Poll realtime vehicle positions and append them to a CSV file
    Vehicles {
        /// CSV file to append vehicle rows to
        #[arg(short, long, default_value = "vehicles.csv")]
        output: PathBuf,

        /// CSV file to append one statistics row per poll to
        #[arg(short, long)]
        stats: Option<PathBuf>,

        /// Number of polls to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,
    },
    /// List lines as JSON, trams first
    Lines,
    /// List stops as JSON
    Stops {
        /// Only stops inside minLng,minLat,maxLng,maxLat
        #[arg(long)]
        bbox: Option<BBox>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_map.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_map.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("reading configuration")?;
    let client = BasicClient::with_connect_timeout(Duration::from_secs(10))?;
    let retry = RetryOptions::default();

    match cli.command {
        Commands::Paths {
            output,
            gzip,
            trams_only_osm,
            watch,
        } => {
            if trams_only_osm {
                config.osm_route_kinds = parse_route_kinds("tram")?;
            }
            write_paths(&client, &config, &retry, output.as_deref(), gzip, watch).await?;
        }
        Commands::Vehicles {
            output,
            stats,
            num_samples,
        } => {
            poll_vehicles(&client, &config, &retry, &output, stats.as_deref(), num_samples)
                .await?;
        }
        Commands::Lines => {
            let schedule = load_schedule(&client, &config.static_urls, &retry).await?;
            write_json(None, &catalog::lines(&schedule), false)?;
        }
        Commands::Stops { bbox } => {
            let schedule = load_schedule(&client, &config.static_urls, &retry).await?;
            let stops = catalog::stops_in_bbox(&schedule, bbox.as_ref());
            info!(stops = stops.len(), "Stops selected");
            write_json(None, &stops, false)?;
        }
    }

    Ok(())
}

/// Builds the network snapshot and writes its paths, optionally rebuilding
/// on the schedule refresh interval.
#[tracing::instrument(skip_all, fields(output = ?output, gzip, watch))]
async fn write_paths(
    client: &BasicClient,
    config: &Config,
    retry: &RetryOptions,
    output: Option<&Path>,
    gzip: bool,
    watch: bool,
) -> Result<()> {
    let start = Instant::now();
    let snapshot = build_snapshot(client, config, retry)
        .await
        .context("building network snapshot")?;
    info!(
        paths = snapshot.paths.len(),
        coverage_pct = snapshot.stats.coverage_pct(),
        osm_pct = snapshot.stats.osm_pct(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Network snapshot built"
    );
    write_json(output, snapshot.paths.as_slice(), gzip)?;

    if !watch {
        return Ok(());
    }

    let handle = SnapshotHandle::new(snapshot);
    loop {
        info!(
            interval_secs = config.schedule_interval.as_secs(),
            "Waiting before next schedule refresh"
        );
        tokio::time::sleep(config.schedule_interval).await;

        if handle.refresh(client, config, retry).await.is_ok() {
            let current = handle.current();
            if let Err(e) = write_json(output, current.paths.as_slice(), gzip) {
                error!(error = %e, "Failed to write refreshed paths");
            }
        }
    }
}

/// Polls realtime feeds, enriching positions against a schedule that is
/// reloaded once the schedule refresh interval has elapsed.
#[tracing::instrument(skip_all, fields(output = %output.display(), num_samples))]
async fn poll_vehicles(
    client: &BasicClient,
    config: &Config,
    retry: &RetryOptions,
    output: &Path,
    stats_path: Option<&Path>,
    num_samples: usize,
) -> Result<()> {
    let mut schedule: ScheduleStore = load_schedule(client, &config.static_urls, retry)
        .await
        .context("loading schedule")?;
    let mut schedule_loaded_at = Instant::now();
    let mut current: HashMap<String, Vehicle> = HashMap::new();

    if num_samples == 0 {
        info!(
            interval_ms = config.realtime_interval.as_millis() as u64,
            "Polling infinitely. Press Ctrl+C to stop."
        );
    }

    let mut sample_count = 0;
    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }
        sample_count += 1;

        if schedule_loaded_at.elapsed() >= config.schedule_interval {
            match load_schedule(client, &config.static_urls, retry).await {
                Ok(fresh) => {
                    schedule = fresh;
                    schedule_loaded_at = Instant::now();
                }
                Err(e) => {
                    warn!(error = %e, "Schedule reload failed, keeping previous schedule");
                    if let Some(path) = stats_path {
                        let failed = PollStats::from_error(&format!("schedule reload: {e}"));
                        append_records(path, &[failed])?;
                    }
                }
            }
        }

        let raw = fetch_vehicle_positions(client, &config.realtime_urls, retry).await;
        let vehicles = enrich_vehicles(&raw, &schedule);

        let diff = reconcile(&current, &vehicles);
        let mut poll = PollStats::new(raw.len(), vehicles.len());
        poll.added = diff.added.len();
        poll.updated = diff.updated.len();
        poll.removed = diff.removed.len();
        diff.apply(&mut current);

        info!(
            sample = sample_count,
            received = poll.received,
            enriched = poll.enriched,
            enriched_pct = poll.enriched_pct(),
            added = poll.added,
            updated = poll.updated,
            removed = poll.removed,
            "Vehicle poll complete"
        );

        let rows: Vec<VehicleRow<'_>> = vehicles.iter().map(VehicleRow::from).collect();
        if let Err(e) = append_records(output, &rows) {
            error!(error = %e, "Failed to write vehicle rows");
            poll.error_message = Some(e.to_string());
        }
        if let Some(path) = stats_path {
            append_records(path, &[poll])?;
        }

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples {
            tokio::time::sleep(config.realtime_interval).await;
        }
    }

    info!(output = %output.display(), vehicles = current.len(), "Finished polling");
    Ok(())
}
