//! Core pipeline of the demo radar relay.
//!
//! Turns a decoded demo into radar-image coordinates:
//!
//! ```text
//! DemoEventSource --header--> MetadataClient --calibration--> translate --> RecordSink
//! ```
//!
//! - [`calibration`] -- fetch and validate the calibration of one exact
//!   map version
//! - [`translate`] -- pure world-to-pixel conversion
//! - [`demo`] -- the demo source contract and the JSON-lines adapter
//! - [`ingest`] -- header-first ingestion driving the pipeline
//! - [`feed`] -- recorded and live record feeds read by sessions
//! - [`config`] -- typed YAML configuration

pub mod calibration;
pub mod config;
pub mod demo;
pub mod feed;
pub mod ingest;
pub mod translate;

pub use calibration::{CalibrationError, MetadataClient};
pub use config::{ConfigError, RelayConfig};
pub use demo::{DecodeError, DemoEventSource, JsonLinesDemo};
pub use feed::{FeedCursor, FeedItem, LiveFeed, LiveSink, RecordSink, TickFeed};
pub use ingest::{Ingested, IngestError, ingest_recorded};
