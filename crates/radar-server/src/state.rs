//! Shared, read-only application state for the session publisher.
//!
//! [`AppState`] is built once per demo after calibration has been
//! resolved and is handed to every session. Nothing in it is mutated by
//! sessions: the calibration is immutable and each session reads the
//! [`TickFeed`] through its own cursor.

use std::sync::Arc;
use std::time::Duration;

use radar_core::config::SessionConfig;
use radar_core::feed::TickFeed;
use radar_types::MapCalibration;

/// Deadlines applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Time allowed between accept and the subscribe message.
    pub handshake_timeout: Duration,
    /// Time allowed for each outbound message.
    pub write_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Calibration of the demo being served.
    pub calibration: Arc<MapCalibration>,
    /// Where sessions read tick records from.
    pub feed: TickFeed,
    /// Per-session deadlines.
    pub session: SessionSettings,
}

impl AppState {
    /// Create the state for one demo.
    pub const fn new(
        calibration: Arc<MapCalibration>,
        feed: TickFeed,
        session: SessionSettings,
    ) -> Self {
        Self {
            calibration,
            feed,
            session,
        }
    }
}
