//! Demo radar relay binary.
//!
//! Reads a decoded demo, resolves the radar-image calibration for the
//! exact map version it was played on, translates every participant
//! position into image pixels, and publishes the result to `WebSocket`
//! subscribers on `/echo`.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line arguments
//! 2. Load configuration from `radar-config.yaml` (or `--config`)
//! 3. Initialize structured logging (tracing)
//! 4. Open the demo named by `-demo`
//! 5. Create the metadata client
//! 6. Run the configured lifecycle:
//!    - `recorded`: ingest the whole demo, then serve it
//!    - `live`: read the header, resolve calibration, serve while ingesting
//!
//! Any error before serving ends the process with a non-zero exit code.

mod cli;
mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use radar_core::config::RelayConfig;
use radar_core::demo::JsonLinesDemo;
use radar_core::feed::{LiveFeed, TickFeed};
use radar_core::ingest::{await_header, ingest_recorded, spawn_live_ingestion};
use radar_core::{IngestError, MetadataClient};
use radar_server::server::ServerError;
use radar_server::state::{AppState, SessionSettings};
use radar_types::FeedMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::error::{RelayError, StartupError};

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if any startup step, ingestion, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse arguments.
    let args = Args::parse_normalized();

    // 2. Load configuration.
    let config = RelayConfig::load_or_default(&args.config).map_err(RelayError::from)?;

    // 3. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        config = %args.config.display(),
        mode = %config.feed.mode,
        port = config.server.port,
        "radar-relay starting"
    );

    run(args.demo, &config).await?;
    Ok(())
}

/// Steps 4 to 6 of the startup sequence.
async fn run(demo: Option<PathBuf>, config: &RelayConfig) -> Result<(), RelayError> {
    // 4. Open the demo.
    let path = demo
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(StartupError::MissingDemoPath)?;
    let source = JsonLinesDemo::open(&path).map_err(|source| StartupError::OpenDemo {
        path: path.clone(),
        source,
    })?;
    info!(demo = %path.display(), "Demo opened");

    // 5. Create the metadata client.
    let client = MetadataClient::new(&config.metadata)?;
    info!(metadata_url = client.base_url(), "Metadata client ready");

    // 6. Run the lifecycle.
    match config.feed.mode {
        FeedMode::Recorded => run_recorded(source, &client, config).await,
        FeedMode::Live => run_live(source, &client, config).await,
    }
}

/// Ingest the demo to completion, then serve it until the process ends.
async fn run_recorded(
    source: JsonLinesDemo<std::io::BufReader<std::fs::File>>,
    client: &MetadataClient,
    config: &RelayConfig,
) -> Result<(), RelayError> {
    let ingested = ingest_recorded(source, client).await?;
    info!(
        map = ingested.header.map_name,
        ticks = ingested.records.len(),
        "Serving recorded demo"
    );

    let state = AppState::new(
        Arc::new(ingested.calibration),
        TickFeed::recorded(ingested.records),
        SessionSettings::from(&config.session),
    );
    radar_server::start_server(&config.server, Arc::new(state)).await?;
    Ok(())
}

/// Start serving as soon as calibration is known and publish records
/// while the demo is still being decoded.
async fn run_live(
    source: JsonLinesDemo<std::io::BufReader<std::fs::File>>,
    client: &MetadataClient,
    config: &RelayConfig,
) -> Result<(), RelayError> {
    let (source, header) = await_header(source).await?;
    let calibration = Arc::new(client.resolve(&header.map_name, header.map_crc).await?);

    let feed = Arc::new(LiveFeed::new(config.feed.live_capacity));
    let state = AppState::new(
        Arc::clone(&calibration),
        TickFeed::Live(Arc::clone(&feed)),
        SessionSettings::from(&config.session),
    );
    let (addr, mut server) = radar_server::spawn_server(&config.server, Arc::new(state)).await?;
    info!(%addr, map = header.map_name, "Serving live demo");

    let interval = Duration::from_millis(config.feed.live_tick_interval_ms);
    let ingestion = spawn_live_ingestion(source, calibration, Arc::clone(&feed), interval);

    tokio::select! {
        served = &mut server => {
            // spawn_blocking tasks cannot be aborted.
            feed.stop();
            return flatten_server(served);
        }
        ingested = ingestion => {
            let ticks = ingested.map_err(|e| IngestError::Task(e.to_string()))??;
            info!(ticks, "Live ingestion finished, still serving");
        }
    }

    flatten_server(server.await)
}

fn flatten_server(
    joined: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), RelayError> {
    joined.map_err(|e| ServerError::Serve(e.to_string()))??;
    Ok(())
}
