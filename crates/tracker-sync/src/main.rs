//! Tracker synchronization binary.
//!
//! Reads tracker reports from standard input, one JSON object per line,
//! and feeds each through the reconciler against an in-process marker
//! store. Malformed lines are logged and skipped; store and marker
//! failures stop the run.
//!
//! ```text
//! {"sender":"+4912345","time":1700000000000,"latitude":52.52,"longitude":13.40}
//! ```
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, else `tracker-config.yaml`, else
//!    defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Open the database and prepare the schema
//! 4. Mirror every stored tracker into the fresh marker store
//! 5. Process reports until end of input

mod error;

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracker_core::{InMemoryMarkerStore, Reconciler, TrackerConfig};
use tracker_db::TrackerDb;
use tracker_types::TrackerReport;

use crate::error::SyncError;

/// Config file read when no path is given.
const DEFAULT_CONFIG_PATH: &str = "tracker-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if startup fails or a report cannot be reconciled.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(std::env::args().nth(1).map(PathBuf::from))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        database_url = %config.database.url,
        trail_length = config.markers.footprint_trail_length,
        "tracker-sync starting"
    );

    run(config).await?;
    Ok(())
}

/// Open the store, resync markers, and drain standard input.
async fn run(config: TrackerConfig) -> Result<(), SyncError> {
    let db = TrackerDb::open(&config.database.to_sqlite_config()).await?;
    let mut reconciler = Reconciler::new(db, InMemoryMarkerStore::new(), config.markers);

    let trackers = reconciler.resync_all().await?;
    info!(trackers, "Markers restored");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number: u64 = 0;
    let mut processed: u64 = 0;
    let mut skipped: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        line_number = line_number.saturating_add(1);
        if line.trim().is_empty() {
            continue;
        }

        let report = match parse_report(line_number, &line) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Skipping report");
                skipped = skipped.saturating_add(1);
                continue;
            }
        };

        let outcome = reconciler.process_incoming_tracker(&report).await?;
        info!(
            sender = %outcome.tracker.sender,
            created = outcome.created,
            footprint_recorded = outcome.footprint_recorded,
            trail_created = outcome.trail.created,
            trail_updated = outcome.trail.updated,
            trail_removed = outcome.trail.removed,
            "Report processed"
        );
        processed = processed.saturating_add(1);
    }

    let (db, markers) = reconciler.into_parts();
    db.close().await;
    info!(processed, skipped, markers = markers.len(), "Input drained");
    Ok(())
}

/// Load configuration from `path`, or from `tracker-config.yaml` in the
/// working directory, falling back to defaults when neither is given.
fn load_config(path: Option<PathBuf>) -> Result<TrackerConfig, SyncError> {
    if let Some(path) = path {
        return Ok(TrackerConfig::from_file(&path)?);
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return Ok(TrackerConfig::from_file(&default_path)?);
    }

    let mut config = TrackerConfig::default();
    config.database.apply_env_overrides();
    Ok(config)
}

/// Parse one input line into a report.
fn parse_report(line_number: u64, line: &str) -> Result<TrackerReport, SyncError> {
    serde_json::from_str(line).map_err(|source| SyncError::Json {
        line: line_number,
        source,
    })
}
