//! Values produced by a demo decoder.
//!
//! These are transient: a [`Snapshot`] lives only until its positions
//! have been translated into a [`TickRecord`](crate::TickRecord).

use serde::{Deserialize, Serialize};

use crate::geometry::WorldPosition;

/// Map identity announced once at the start of a demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoHeader {
    /// Map name as reported by the server (e.g. `de_dust2`).
    pub map_name: String,
    /// Content checksum distinguishing releases of the same map name.
    pub map_crc: u32,
}

/// One participant's state within a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Display name.
    pub name: String,
    /// Whether the participant is alive at this tick.
    pub alive: bool,
    /// Horizontal world position.
    pub position: WorldPosition,
}

/// World state for a single tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Engine tick number.
    pub tick: u64,
    /// Zero or more participants present at this tick.
    pub participants: Vec<Participant>,
}
