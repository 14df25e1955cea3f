//! `WebSocket` endpoint for subscriber sessions.
//!
//! Clients connect to `GET /echo`, send one message of any content to
//! subscribe, and then receive the JSON message stream described in
//! [`radar_types::messages`]. The session logic lives in
//! [`crate::session`]; this module only adapts Axum's [`WebSocket`] to
//! [`SessionChannel`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;

use crate::session::{Inbound, SessionChannel, SessionIoError, run_session};
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and run one
/// subscriber session on it.
///
/// # Route
///
/// `GET /echo`
pub async fn ws_echo(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut channel = WsChannel::new(socket);
        run_session(&mut channel, &state).await;
    })
}

/// [`SessionChannel`] over an Axum [`WebSocket`].
#[derive(Debug)]
pub struct WsChannel {
    socket: WebSocket,
}

impl WsChannel {
    /// Wrap an upgraded socket.
    pub const fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl SessionChannel for WsChannel {
    async fn recv(&mut self) -> Option<Result<Inbound, SessionIoError>> {
        let inbound = match self.socket.recv().await? {
            Ok(Message::Text(text)) => Ok(Inbound::Message(text.as_str().as_bytes().to_vec())),
            Ok(Message::Binary(bytes)) => Ok(Inbound::Message(bytes.to_vec())),
            Ok(Message::Ping(_) | Message::Pong(_)) => Ok(Inbound::Control),
            Ok(Message::Close(_)) => Ok(Inbound::Close),
            Err(e) => Err(SessionIoError::Read(e.to_string())),
        };
        Some(inbound)
    }

    async fn send_text(&mut self, text: String) -> Result<(), SessionIoError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SessionIoError::Write(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &'static str) -> Result<(), SessionIoError> {
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        self.socket
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| SessionIoError::Write(e.to_string()))
    }
}
