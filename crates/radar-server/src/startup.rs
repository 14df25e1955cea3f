//! Background server startup.
//!
//! Live mode starts accepting subscribers while ingestion is still
//! producing records, so the server runs on its own task.

use std::net::SocketAddr;
use std::sync::Arc;

use radar_core::config::ServerSettings;
use tokio::task::JoinHandle;

use crate::server::{ServerError, bind, serve};
use crate::state::AppState;

/// Bind eagerly, then serve on a background Tokio task.
///
/// Returns the address actually bound (useful with port 0) and a handle
/// that resolves only if serving fails or the task is aborted.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] before anything is spawned if the
/// address is invalid or the port is taken.
pub async fn spawn_server(
    settings: &ServerSettings,
    state: Arc<AppState>,
) -> Result<(SocketAddr, JoinHandle<Result<(), ServerError>>), ServerError> {
    let listener = bind(settings).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(e.to_string()))?;
    let handle = tokio::spawn(serve(listener, state));
    tracing::info!(%addr, "radar server spawned on background task");
    Ok((addr, handle))
}
