//! Session publisher for the demo radar relay.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/echo`) where each connection is one
//!   subscriber session: one inbound subscribe message, then an ack,
//!   every tick record in order, an end marker, and a normal close
//! - **REST endpoints** for the resolved calibration and feed status
//!
//! # Architecture
//!
//! All sessions share one read-only [`AppState`]. Each session reads
//! the tick feed through its own cursor, so a slow client only delays
//! itself. Session logic is written against the [`SessionChannel`]
//! trait and is tested without a network.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerError, start_server};
pub use session::{SessionChannel, SessionEnd, SessionReport, run_session};
pub use startup::spawn_server;
pub use state::{AppState, SessionSettings};
