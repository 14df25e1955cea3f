//! Outbound wire messages for a subscriber session.
//!
//! Every message is one JSON text frame tagged by `type`. A well-behaved
//! session sees exactly one `ack`, then zero or more `tick` (and, in live
//! mode, `lagged`) messages, then `end` followed by a normal close. A
//! client that never sees `end` knows the connection dropped before the
//! demo was fully replayed.

use serde::{Deserialize, Serialize};

use crate::geometry::MapCalibration;
use crate::ids::SessionId;
use crate::records::TickRecord;

/// How tick records reach sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// The demo is fully ingested first; every session replays all records.
    #[default]
    Recorded,
    /// Records are published while the demo is being ingested; sessions
    /// see records from the moment they subscribe.
    Live,
}

impl core::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Recorded => f.write_str("recorded"),
            Self::Live => f.write_str("live"),
        }
    }
}

/// A message written to a subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    /// Acknowledges the subscribe handshake.
    Ack {
        /// Identifier assigned to this session.
        session: SessionId,
        /// Map the demo was played on.
        map: &'a str,
        /// Calibration used for every pixel position in this session.
        calibration: &'a MapCalibration,
        /// Feed mode of this process.
        mode: FeedMode,
        /// Number of records that will follow, when known up front.
        #[serde(skip_serializing_if = "Option::is_none")]
        ticks: Option<u64>,
    },

    /// One derived tick.
    Tick(&'a TickRecord),

    /// The session fell behind a live feed and skipped records.
    Lagged {
        /// How many records were dropped for this session.
        skipped: u64,
    },

    /// The demo has been fully replayed; a normal close follows.
    End {
        /// Total number of records in the demo.
        ticks: u64,
    },
}
