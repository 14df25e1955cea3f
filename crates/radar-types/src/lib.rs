//! Shared type definitions for the demo radar relay.
//!
//! This crate is the single source of truth for the data that flows
//! between demo ingestion, coordinate translation, and the session
//! publisher.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for session identifiers
//! - [`geometry`] -- World/pixel positions and the validated [`MapCalibration`]
//! - [`demo`] -- Header and per-tick snapshots produced by a demo decoder
//! - [`records`] -- Derived per-tick records published to clients
//! - [`messages`] -- Outbound wire messages

pub mod demo;
pub mod geometry;
pub mod ids;
pub mod messages;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use demo::{DemoHeader, Participant, Snapshot};
pub use geometry::{CalibrationInvariantError, MapCalibration, PixelPosition, WorldPosition};
pub use ids::SessionId;
pub use messages::{FeedMode, ServerMessage};
pub use records::{PlayerMarker, TickRecord};
