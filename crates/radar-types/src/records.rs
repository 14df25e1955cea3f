//! Derived per-tick records published to connected clients.

use serde::{Deserialize, Serialize};

use crate::geometry::PixelPosition;

/// A participant placed on the radar image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMarker {
    /// Display name.
    pub name: String,
    /// Whether the participant is alive at this tick.
    pub alive: bool,
    /// Scaled pixel position on the radar image.
    pub position: PixelPosition,
}

/// Everything a client needs to draw one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickRecord {
    /// Engine tick number the record was derived from.
    pub tick: u64,
    /// Markers in decoder order.
    pub players: Vec<PlayerMarker>,
}
