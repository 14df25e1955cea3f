//! Read-only REST handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use radar_core::feed::TickFeed;
use radar_types::{FeedMode, MapCalibration};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body of `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Map being served.
    pub map: String,
    /// Feed mode.
    pub mode: FeedMode,
    /// Records available (recorded) or published so far (live).
    pub ticks: u64,
    /// Whether ingestion has finished.
    pub finished: bool,
}

/// `GET /api/calibration` -- the calibration every session uses.
pub async fn get_calibration(State(state): State<Arc<AppState>>) -> Json<MapCalibration> {
    Json(MapCalibration::clone(&state.calibration))
}

/// `GET /api/status` -- what is being served.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (ticks, finished) = match &state.feed {
        TickFeed::Recorded(records) => (u64::try_from(records.len()).unwrap_or(u64::MAX), true),
        TickFeed::Live(live) => (live.published(), live.is_finished()),
    };
    Json(StatusResponse {
        map: state.calibration.map_name().to_owned(),
        mode: state.feed.mode(),
        ticks,
        finished,
    })
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
