//! Subscriber session state machine.
//!
//! A session moves through
//! `Connecting -> AwaitingSubscribe -> Streaming -> Closed`:
//!
//! 1. After accept it waits, up to the handshake deadline, for one
//!    message from the client. The payload is not interpreted.
//! 2. It then writes an `ack`, one `tick` per record in tick order, and
//!    finally `end`, each under the write deadline.
//! 3. It closes with 1000 after `end`, or with 1011 on any failure.
//!
//! Peer closure is watched while streaming so a vanished client ends the
//! session at the next record instead of after the whole demo. Failures
//! stay local to the session; nothing here can reach the listener or
//! another session.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::close_code;
use radar_core::feed::FeedItem;
use radar_types::{ServerMessage, SessionId};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// I/O failures local to one session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionIoError {
    /// Reading from the client failed.
    #[error("read failed: {0}")]
    Read(String),

    /// Writing to the client failed.
    #[error("write failed: {0}")]
    Write(String),

    /// A write did not complete within its deadline.
    #[error("write deadline exceeded: {0}")]
    Timeout(String),

    /// An outbound message could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// A message received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A data frame (text or binary).
    Message(Vec<u8>),
    /// A ping or pong.
    Control,
    /// The client started the closing handshake.
    Close,
}

/// A bidirectional framed message channel to one client.
///
/// `recv` must be cancel safe: the session races it against the record
/// feed and drops it when a record is ready first.
#[async_trait]
pub trait SessionChannel: Send {
    /// Next inbound message, or `None` once the connection is gone.
    async fn recv(&mut self) -> Option<Result<Inbound, SessionIoError>>;

    /// Write one text message.
    async fn send_text(&mut self, text: String) -> Result<(), SessionIoError>;

    /// Start the closing handshake with `code`.
    async fn close(&mut self, code: u16, reason: &'static str) -> Result<(), SessionIoError>;
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet set up.
    Connecting,
    /// Waiting for the client's subscribe message.
    AwaitingSubscribe,
    /// Writing records.
    Streaming,
    /// Terminal.
    Closed,
}

impl core::fmt::Display for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::AwaitingSubscribe => "awaiting_subscribe",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every record and `end` were delivered.
    Completed {
        /// Records in the demo.
        ticks: u64,
    },
    /// The client closed or disconnected.
    PeerClosed,
    /// No subscribe message arrived in time.
    HandshakeTimeout,
    /// A live feed disappeared without finishing.
    FeedClosed,
    /// A read or write failed.
    Failed(SessionIoError),
}

impl SessionEnd {
    const fn close_frame(&self) -> Option<(u16, &'static str)> {
        match self {
            Self::Completed { .. } => Some((close_code::NORMAL, "")),
            Self::PeerClosed => None,
            Self::HandshakeTimeout => Some((close_code::ERROR, "subscribe timeout")),
            Self::FeedClosed => Some((close_code::ERROR, "feed closed")),
            Self::Failed(_) => Some((close_code::ERROR, "session error")),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// The session's identifier.
    pub id: SessionId,
    /// State at return; always [`SessionState::Closed`].
    pub state: SessionState,
    /// Whether the session ever reached [`SessionState::Streaming`].
    pub entered_streaming: bool,
    /// Tick records written.
    pub records_sent: u64,
    /// Why it ended.
    pub end: SessionEnd,
}

struct Session {
    id: SessionId,
    state: SessionState,
    entered_streaming: bool,
    records_sent: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Connecting,
            entered_streaming: false,
            records_sent: 0,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.id, from = %self.state, to = %next, "Session state change");
        if next == SessionState::Streaming {
            self.entered_streaming = true;
        }
        self.state = next;
    }
}

/// Drive one session from accept to close.
///
/// Never returns an error: every failure ends this session only and is
/// reported in the [`SessionReport`].
pub async fn run_session<C: SessionChannel>(channel: &mut C, state: &AppState) -> SessionReport {
    let mut session = Session::new();
    info!(session = %session.id, "Session accepted");

    session.transition(SessionState::AwaitingSubscribe);
    let end = match await_subscribe(channel, state.session.handshake_timeout).await {
        Ok(()) => {
            session.transition(SessionState::Streaming);
            stream(channel, state, &mut session).await
        }
        Err(end) => end,
    };

    if let Some((code, reason)) = end.close_frame() {
        if let Err(e) = channel.close(code, reason).await {
            debug!(session = %session.id, error = %e, "Close frame not delivered");
        }
    }
    session.transition(SessionState::Closed);

    match &end {
        SessionEnd::Completed { ticks } => {
            info!(session = %session.id, ticks, "Session completed");
        }
        SessionEnd::PeerClosed => {
            info!(session = %session.id, records_sent = session.records_sent, "Session closed by client");
        }
        other => {
            warn!(session = %session.id, records_sent = session.records_sent, end = ?other, "Session ended abnormally");
        }
    }

    SessionReport {
        id: session.id,
        state: session.state,
        entered_streaming: session.entered_streaming,
        records_sent: session.records_sent,
        end,
    }
}

async fn await_subscribe<C: SessionChannel>(
    channel: &mut C,
    timeout: Duration,
) -> Result<(), SessionEnd> {
    let subscribe = async {
        loop {
            match channel.recv().await {
                Some(Ok(Inbound::Message(payload))) => {
                    debug!(bytes = payload.len(), "Subscribe message received");
                    return Ok(());
                }
                Some(Ok(Inbound::Control)) => {}
                Some(Ok(Inbound::Close)) | None => return Err(SessionEnd::PeerClosed),
                Some(Err(e)) => return Err(SessionEnd::Failed(e)),
            }
        }
    };
    tokio::time::timeout(timeout, subscribe)
        .await
        .unwrap_or(Err(SessionEnd::HandshakeTimeout))
}

async fn stream<C: SessionChannel>(
    channel: &mut C,
    state: &AppState,
    session: &mut Session,
) -> SessionEnd {
    let write_timeout = state.session.write_timeout;
    // Subscribe before acknowledging so a live client sees every record
    // published after its ack.
    let mut cursor = state.feed.cursor();

    let ack = ServerMessage::Ack {
        session: session.id,
        map: state.calibration.map_name(),
        calibration: &state.calibration,
        mode: state.feed.mode(),
        ticks: state.feed.known_len(),
    };
    if let Err(e) = send(channel, &ack, write_timeout).await {
        return SessionEnd::Failed(e);
    }

    loop {
        tokio::select! {
            biased;

            inbound = channel.recv() => {
                match inbound {
                    Some(Ok(Inbound::Close)) | None => return SessionEnd::PeerClosed,
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    // Further client messages carry no meaning yet.
                    Some(Ok(Inbound::Message(_) | Inbound::Control)) => {}
                }
            }
            item = cursor.next() => {
                let result = match item {
                    Some(FeedItem::Tick(record)) => {
                        let sent = send(channel, &ServerMessage::Tick(&record), write_timeout).await;
                        if sent.is_ok() {
                            session.records_sent = session.records_sent.saturating_add(1);
                        }
                        sent
                    }
                    Some(FeedItem::Lagged(skipped)) => {
                        warn!(session = %session.id, skipped, "Session lagged behind live feed");
                        send(channel, &ServerMessage::Lagged { skipped }, write_timeout).await
                    }
                    Some(FeedItem::End(ticks)) => {
                        return match send(channel, &ServerMessage::End { ticks }, write_timeout).await {
                            Ok(()) => SessionEnd::Completed { ticks },
                            Err(e) => SessionEnd::Failed(e),
                        };
                    }
                    None => return SessionEnd::FeedClosed,
                };
                if let Err(e) = result {
                    return SessionEnd::Failed(e);
                }
            }
        }
    }
}

async fn send<C: SessionChannel>(
    channel: &mut C,
    message: &ServerMessage<'_>,
    write_timeout: Duration,
) -> Result<(), SessionIoError> {
    let text =
        serde_json::to_string(message).map_err(|e| SessionIoError::Serialization(e.to_string()))?;
    tokio::time::timeout(write_timeout, channel.send_text(text))
        .await
        .map_err(|e| SessionIoError::Timeout(e.to_string()))?
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use std::sync::Arc;

    use radar_core::feed::{LiveFeed, TickFeed};
    use radar_types::{MapCalibration, PixelPosition, PlayerMarker, TickRecord};
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;
    use crate::state::SessionSettings;

    #[derive(Debug, PartialEq)]
    enum Outbound {
        Text(String),
        Close(u16),
    }

    /// In-memory channel; the test holds the other ends.
    struct MemoryChannel {
        inbound: mpsc::UnboundedReceiver<Inbound>,
        outbound: mpsc::UnboundedSender<Outbound>,
        fail_after: Option<usize>,
        stall_writes: bool,
        writes: usize,
    }

    struct Client {
        tx: mpsc::UnboundedSender<Inbound>,
        rx: mpsc::UnboundedReceiver<Outbound>,
    }

    impl Client {
        fn subscribe(&self, payload: &str) {
            self.tx.send(Inbound::Message(payload.as_bytes().to_vec())).unwrap();
        }

        fn drain(&mut self) -> Vec<Outbound> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn pair() -> (MemoryChannel, Client) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (
            MemoryChannel {
                inbound: in_rx,
                outbound: out_tx,
                fail_after: None,
                stall_writes: false,
                writes: 0,
            },
            Client { tx: in_tx, rx: out_rx },
        )
    }

    #[async_trait]
    impl SessionChannel for MemoryChannel {
        async fn recv(&mut self) -> Option<Result<Inbound, SessionIoError>> {
            self.inbound.recv().await.map(Ok)
        }

        async fn send_text(&mut self, text: String) -> Result<(), SessionIoError> {
            if self.stall_writes {
                std::future::pending::<()>().await;
            }
            if self.fail_after.is_some_and(|limit| self.writes >= limit) {
                return Err(SessionIoError::Write(String::from("connection reset")));
            }
            self.writes = self.writes.saturating_add(1);
            self.outbound
                .send(Outbound::Text(text))
                .map_err(|e| SessionIoError::Write(e.to_string()))
        }

        async fn close(&mut self, code: u16, _reason: &'static str) -> Result<(), SessionIoError> {
            self.outbound
                .send(Outbound::Close(code))
                .map_err(|e| SessionIoError::Write(e.to_string()))
        }
    }

    fn record(tick: u64) -> TickRecord {
        TickRecord {
            tick,
            players: vec![PlayerMarker {
                name: String::from("ropz"),
                alive: true,
                position: PixelPosition::new(1.0, 2.0),
            }],
        }
    }

    fn calibration() -> Arc<MapCalibration> {
        Arc::new(MapCalibration::new("de_dust2", -2476.0, 3239.0, 4.4).unwrap())
    }

    fn recorded_state(ticks: u64) -> AppState {
        AppState::new(
            calibration(),
            TickFeed::recorded((1..=ticks).map(record).collect()),
            SessionSettings::default(),
        )
    }

    fn texts(out: &[Outbound]) -> Vec<Value> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Text(t) => Some(serde_json::from_str(t).unwrap()),
                Outbound::Close(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn streams_ack_ticks_end_then_closes_normally() {
        let state = recorded_state(3);
        let (mut channel, mut client) = pair();
        client.subscribe("{\"subscribe\":true}");

        let report = run_session(&mut channel, &state).await;
        assert_eq!(report.state, SessionState::Closed);
        assert!(report.entered_streaming);
        assert_eq!(report.records_sent, 3);
        assert_eq!(report.end, SessionEnd::Completed { ticks: 3 });

        let out = client.drain();
        assert_eq!(out.last(), Some(&Outbound::Close(close_code::NORMAL)));
        let msgs = texts(&out);
        assert_eq!(msgs.len(), 5);
        assert_eq!(msgs[0]["type"], "ack");
        assert_eq!(msgs[0]["map"], "de_dust2");
        assert_eq!(msgs[0]["ticks"], 3);
        assert_eq!(msgs[0]["session"], report.id.to_string());
        let ticks: Vec<u64> = msgs[1..4].iter().map(|m| m["tick"].as_u64().unwrap()).collect();
        assert_eq!(ticks, vec![1, 2, 3]);
        assert_eq!(msgs[4], serde_json::json!({"type": "end", "ticks": 3}));
    }

    #[tokio::test]
    async fn pings_before_subscribe_are_ignored() {
        let state = recorded_state(1);
        let (mut channel, mut client) = pair();
        client.tx.send(Inbound::Control).unwrap();
        client.subscribe("anything at all");

        let report = run_session(&mut channel, &state).await;
        assert_eq!(report.end, SessionEnd::Completed { ticks: 1 });
        assert_eq!(texts(&client.drain()).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_client_never_streams() {
        let state = recorded_state(3);
        let (mut channel, mut client) = pair();

        let report = run_session(&mut channel, &state).await;
        assert_eq!(report.state, SessionState::Closed);
        assert!(!report.entered_streaming);
        assert_eq!(report.end, SessionEnd::HandshakeTimeout);
        assert_eq!(client.drain(), vec![Outbound::Close(close_code::ERROR)]);
    }

    #[tokio::test]
    async fn client_leaving_before_subscribe_sends_nothing() {
        let state = recorded_state(3);
        let (mut channel, mut client) = pair();
        client.tx.send(Inbound::Close).unwrap();

        let report = run_session(&mut channel, &state).await;
        assert_eq!(report.end, SessionEnd::PeerClosed);
        assert!(!report.entered_streaming);
        assert!(client.drain().is_empty());
    }

    #[tokio::test]
    async fn client_leaving_mid_stream_stops_writes() {
        let state = recorded_state(1_000);
        let (mut channel, mut client) = pair();
        client.subscribe("{}");
        let Client { tx, rx } = client;
        drop(tx);

        let report = run_session(&mut channel, &state).await;
        assert_eq!(report.end, SessionEnd::PeerClosed);
        assert!(report.entered_streaming);
        assert!(report.records_sent < 1_000);
        drop(rx);
    }

    #[tokio::test]
    async fn write_failure_closes_with_error() {
        let state = recorded_state(10);
        let (mut channel, mut client) = pair();
        channel.fail_after = Some(3);
        client.subscribe("{}");

        let report = run_session(&mut channel, &state).await;
        assert!(matches!(report.end, SessionEnd::Failed(SessionIoError::Write(_))));
        assert_eq!(report.records_sent, 2);
        assert_eq!(report.state, SessionState::Closed);

        let out = client.drain();
        assert_eq!(texts(&out).len(), 3);
        assert_eq!(out.last(), Some(&Outbound::Close(close_code::ERROR)));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_writer_hits_deadline() {
        let state = recorded_state(2);
        let (mut channel, client) = pair();
        channel.stall_writes = true;
        client.subscribe("{}");

        let report = run_session(&mut channel, &state).await;
        assert!(matches!(report.end, SessionEnd::Failed(SessionIoError::Timeout(_))));
        assert_eq!(report.records_sent, 0);
        drop(client);
    }

    #[tokio::test]
    async fn concurrent_sessions_are_isolated() {
        let state = recorded_state(4);
        let (mut chan_a, mut client_a) = pair();
        let (mut chan_b, mut client_b) = pair();
        client_a.subscribe("secret-from-a");
        client_b.subscribe("secret-from-b");

        let (report_a, report_b) = tokio::join!(
            run_session(&mut chan_a, &state),
            run_session(&mut chan_b, &state)
        );
        assert_ne!(report_a.id, report_b.id);
        assert_eq!(report_a.records_sent, 4);
        assert_eq!(report_b.records_sent, 4);

        let out_a = client_a.drain();
        let out_b = client_b.drain();
        for (out, own, other) in [(&out_a, report_a.id, report_b.id), (&out_b, report_b.id, report_a.id)] {
            let raw: Vec<&str> = out
                .iter()
                .filter_map(|o| match o {
                    Outbound::Text(t) => Some(t.as_str()),
                    Outbound::Close(_) => None,
                })
                .collect();
            assert!(raw.iter().all(|t| !t.contains("secret-from")));
            assert!(raw.iter().all(|t| !t.contains(&other.to_string())));
            assert!(raw[0].contains(&own.to_string()));
            assert_eq!(raw.len(), 6);
        }
    }

    #[tokio::test]
    async fn live_session_reports_lag_then_ends() {
        let live = Arc::new(LiveFeed::new(2));
        let state = AppState::new(
            calibration(),
            TickFeed::Live(Arc::clone(&live)),
            SessionSettings::default(),
        );
        let (mut channel, mut client) = pair();
        client.subscribe("{}");

        let task = tokio::spawn(async move { run_session(&mut channel, &state).await });

        // Wait for the ack; by then the session is subscribed.
        let ack = client.rx.recv().await.unwrap();
        assert!(matches!(&ack, Outbound::Text(t) if t.contains("\"live\"")));

        for tick in 1..=5 {
            live.publish(record(tick));
        }
        live.finish();

        let report = task.await.unwrap();
        assert_eq!(report.end, SessionEnd::Completed { ticks: 5 });
        assert_eq!(report.records_sent, 1);

        let msgs = texts(&client.drain());
        assert_eq!(msgs[0], serde_json::json!({"type": "lagged", "skipped": 4}));
        assert_eq!(msgs[1]["tick"], 5);
        assert_eq!(msgs[2], serde_json::json!({"type": "end", "ticks": 5}));
    }
}
