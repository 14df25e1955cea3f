//! Map calibration resolution.
//!
//! Radar images are versioned by map name and content checksum. The
//! metadata host serves one `info.json` per version at
//! `{base_url}/{map_name}/{map_crc}/info.json`; the body is a JSON object
//! keyed by map name whose values carry `pos_x`, `pos_y`, and `scale` as
//! decimal strings:
//!
//! ```json
//! {"de_dust2": {"pos_x": "-2476", "pos_y": "3239", "scale": "4.4"}}
//! ```
//!
//! Resolution performs exactly one fetch and never retries or falls back
//! to a default calibration: a wrong origin or scale would silently
//! corrupt every derived coordinate.

use std::collections::BTreeMap;
use std::time::Duration;

use radar_types::MapCalibration;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::MetadataConfig;

/// Errors that can occur while resolving a map calibration.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// The metadata source was unreachable or returned malformed data.
    #[error("map metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// The metadata document has no entry for the requested map.
    #[error("no metadata entry for map {0:?}")]
    MapEntryNotFound(String),
}

/// One map's entry in an `info.json` document.
#[derive(Debug, Deserialize)]
struct MetadataEntry {
    pos_x: String,
    pos_y: String,
    scale: String,
}

/// Build the metadata address for one map version.
pub fn metadata_url(base_url: &str, map_name: &str, map_crc: u32) -> String {
    format!(
        "{}/{map_name}/{map_crc}/info.json",
        base_url.trim_end_matches('/')
    )
}

/// Parse an `info.json` body and extract the calibration for `map_name`.
///
/// # Errors
///
/// Returns [`CalibrationError::MetadataUnavailable`] if the document is not
/// a map of well-formed entries, a field is not a decimal number, or the
/// values violate the calibration invariants (e.g. `scale <= 0`).
/// Returns [`CalibrationError::MapEntryNotFound`] if the document parses
/// but has no entry for `map_name`.
pub fn parse_metadata_document(
    map_name: &str,
    body: &[u8],
) -> Result<MapCalibration, CalibrationError> {
    let document: BTreeMap<String, MetadataEntry> = serde_json::from_slice(body)
        .map_err(|e| CalibrationError::MetadataUnavailable(format!("malformed info.json: {e}")))?;

    let entry = document
        .get(map_name)
        .ok_or_else(|| CalibrationError::MapEntryNotFound(map_name.to_owned()))?;

    let origin_x = parse_decimal("pos_x", &entry.pos_x)?;
    let origin_y = parse_decimal("pos_y", &entry.pos_y)?;
    let scale = parse_decimal("scale", &entry.scale)?;

    MapCalibration::new(map_name, origin_x, origin_y, scale).map_err(|e| {
        CalibrationError::MetadataUnavailable(format!("invalid calibration for {map_name}: {e}"))
    })
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64, CalibrationError> {
    raw.trim().parse::<f64>().map_err(|e| {
        CalibrationError::MetadataUnavailable(format!("field {field} is not a number ({raw:?}): {e}"))
    })
}

/// HTTP client for the radar metadata host.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    /// Create a client for the configured metadata host.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::MetadataUnavailable`] if the HTTP client
    /// cannot be initialised.
    pub fn new(config: &MetadataConfig) -> Result<Self, CalibrationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                CalibrationError::MetadataUnavailable(format!("HTTP client init failed: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// The base URL this client fetches from.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and parse the calibration for one exact map version.
    ///
    /// Performs a single GET with no retry.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::MetadataUnavailable`] on transport
    /// failure, a non-200 status, or a malformed body, and
    /// [`CalibrationError::MapEntryNotFound`] when the document lacks an
    /// entry for `map_name`.
    pub async fn resolve(
        &self,
        map_name: &str,
        map_crc: u32,
    ) -> Result<MapCalibration, CalibrationError> {
        let url = metadata_url(&self.base_url, map_name, map_crc);
        debug!(%url, "Fetching map metadata");

        let response = self.client.get(&url).send().await.map_err(|e| {
            CalibrationError::MetadataUnavailable(format!("request to {url} failed: {e}"))
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(CalibrationError::MetadataUnavailable(format!(
                "{url} returned {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            CalibrationError::MetadataUnavailable(format!("reading body from {url} failed: {e}"))
        })?;

        let calibration = parse_metadata_document(map_name, &body)?;
        info!(
            map = map_name,
            map_crc,
            origin_x = calibration.origin_x(),
            origin_y = calibration.origin_y(),
            scale = calibration.scale(),
            "Map calibration resolved"
        );
        Ok(calibration)
    }
}
