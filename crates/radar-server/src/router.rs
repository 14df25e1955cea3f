//! Axum router construction.
//!
//! Assembles the `WebSocket` session endpoint and the read-only REST
//! routes into a single [`Router`] with CORS enabled for browser radar
//! clients served from elsewhere.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /echo` -- `WebSocket` subscriber session
/// - `GET /api/calibration` -- resolved map calibration
/// - `GET /api/status` -- map, feed mode, and progress
///
/// Any other path answers 404 with a JSON body.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/echo", get(ws::ws_echo))
        .route("/api/calibration", get(handlers::get_calibration))
        .route("/api/status", get(handlers::get_status))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
