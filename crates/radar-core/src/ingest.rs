//! Demo ingestion: header, calibration, then every snapshot in order.
//!
//! The header is awaited explicitly before any snapshot is touched, since
//! nothing can be translated until the calibration for the exact map
//! version is known. Decoding blocks, so it runs on Tokio's blocking pool;
//! the demo source is moved into that task and dropped when it finishes,
//! on success and on error alike.

use std::sync::Arc;
use std::time::Duration;

use radar_types::{DemoHeader, MapCalibration, PlayerMarker, Snapshot, TickRecord};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::calibration::{CalibrationError, MetadataClient};
use crate::demo::{DecodeError, DemoEventSource};
use crate::feed::{LiveFeed, LiveSink, PacedSink, RecordSink};
use crate::translate::translate_scaled;

/// Errors that abort ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The demo could not be decoded.
    #[error("decode error: {source}")]
    Decode {
        /// The underlying decode error.
        #[from]
        source: DecodeError,
    },

    /// The map calibration could not be resolved.
    #[error("calibration error: {source}")]
    Calibration {
        /// The underlying calibration error.
        #[from]
        source: CalibrationError,
    },

    /// A blocking decode task panicked or was cancelled.
    #[error("ingestion task failed: {0}")]
    Task(String),
}

/// Result of a completed recorded ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// The demo header.
    pub header: DemoHeader,
    /// Calibration for the exact map version played.
    pub calibration: MapCalibration,
    /// One record per snapshot, in tick order.
    pub records: Vec<TickRecord>,
}

/// Derive the published record for one snapshot.
pub fn derive_record(snapshot: Snapshot, calibration: &MapCalibration) -> TickRecord {
    TickRecord {
        tick: snapshot.tick,
        players: snapshot
            .participants
            .into_iter()
            .map(|p| PlayerMarker {
                position: translate_scaled(p.position, calibration),
                name: p.name,
                alive: p.alive,
            })
            .collect(),
    }
}

/// Translate every remaining snapshot into `sink`, in order.
///
/// Stops early, without error, once the sink reports it is stopped.
/// Returns the number of records produced.
///
/// # Errors
///
/// Returns the first [`DecodeError`]; records already handed to the sink
/// stay there.
pub fn drain<S, K>(
    source: &mut S,
    calibration: &MapCalibration,
    sink: &mut K,
) -> Result<u64, DecodeError>
where
    S: DemoEventSource + ?Sized,
    K: RecordSink + ?Sized,
{
    let mut produced: u64 = 0;
    while !sink.is_stopped() {
        let Some(snapshot) = source.next_snapshot()? else {
            break;
        };
        debug!(tick = snapshot.tick, participants = snapshot.participants.len(), "Snapshot decoded");
        sink.publish(derive_record(snapshot, calibration));
        produced = produced.saturating_add(1);
    }
    Ok(produced)
}

/// Block (on the blocking pool) until the source yields its header.
///
/// The source is handed back so draining can continue.
///
/// # Errors
///
/// Returns [`IngestError::Decode`] if the header cannot be read.
pub async fn await_header<S>(mut source: S) -> Result<(S, DemoHeader), IngestError>
where
    S: DemoEventSource + Send + 'static,
{
    let (source, header) = tokio::task::spawn_blocking(move || {
        let header = source.await_header();
        (source, header)
    })
    .await
    .map_err(|e| IngestError::Task(e.to_string()))?;

    let header = header?;
    info!(map = header.map_name, map_crc = header.map_crc, "Demo header read");
    Ok((source, header))
}

/// Ingest a whole demo before serving.
///
/// Awaits the header, resolves calibration with a single metadata fetch,
/// then drains every snapshot.
///
/// # Errors
///
/// Returns [`IngestError`] on any decode or calibration failure. No
/// partial result is returned.
pub async fn ingest_recorded<S>(source: S, client: &MetadataClient) -> Result<Ingested, IngestError>
where
    S: DemoEventSource + Send + 'static,
{
    let (mut source, header) = await_header(source).await?;
    let calibration = client.resolve(&header.map_name, header.map_crc).await?;

    let task_calibration = calibration.clone();
    let records = tokio::task::spawn_blocking(move || {
        let mut records = Vec::new();
        drain(&mut source, &task_calibration, &mut records).map(|_| records)
    })
    .await
    .map_err(|e| IngestError::Task(e.to_string()))??;

    info!(
        map = header.map_name,
        ticks = records.len(),
        "Demo ingestion complete"
    );

    Ok(Ingested {
        header,
        calibration,
        records,
    })
}

/// Drain a source into a live feed on the blocking pool.
///
/// The feed is finished only when the source reaches end-of-stream, so
/// sessions never see `end` for a demo that failed to decode. Calling
/// [`LiveFeed::stop`] makes the task return after the current record.
pub fn spawn_live_ingestion<S>(
    mut source: S,
    calibration: Arc<MapCalibration>,
    feed: Arc<LiveFeed>,
    interval: Duration,
) -> JoinHandle<Result<u64, IngestError>>
where
    S: DemoEventSource + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut sink = PacedSink::new(LiveSink::new(Arc::clone(&feed)), interval);
        let produced = drain(&mut source, &calibration, &mut sink)?;
        if feed.is_stopped() {
            info!(
                map = calibration.map_name(),
                ticks = produced,
                "Live demo ingestion stopped early"
            );
            return Ok(produced);
        }
        feed.finish();
        info!(
            map = calibration.map_name(),
            ticks = produced,
            "Live demo ingestion complete"
        );
        Ok(produced)
    })
}
