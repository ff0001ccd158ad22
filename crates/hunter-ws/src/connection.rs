//! WebSocket connection manager.
//!
//! Owns at most one live stream connection, keyed by the viewer key. Each
//! connection runs in its own task and reports back through an event channel;
//! the consumer drives the connection state machine from those events.
//!
//! Opening a new connection always cancels the previous one first. Events
//! carry the [`ConnectionId`] of the connection that produced them so the
//! consumer can drop late events from a superseded connection.

use crate::error::{WsError, WsResult};
use futures_util::{SinkExt, StreamExt};
use hunter_core::ViewerKey;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Close code reported when the peer closes without a status code.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Close code reported when the stream ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Policy violation; used for handshakes refused with a rejection HTTP status.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base stream URL; the viewer key is attached as the `token` parameter.
    pub url: String,
    /// Close codes treated as "viewer key rejected".
    pub unauthorized_close_codes: Vec<u16>,
    /// Handshake HTTP statuses treated as "viewer key rejected".
    pub unauthorized_http_statuses: Vec<u16>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "wss://hunter.rosieai.dev/stream".to_string(),
            unauthorized_close_codes: vec![CLOSE_POLICY_VIOLATION, 4403],
            unauthorized_http_statuses: vec![401, 403],
        }
    }
}

impl ConnectionConfig {
    /// Classify a close code received from the remote.
    pub fn classify_close(&self, code: u16) -> CloseDisposition {
        if self.unauthorized_close_codes.contains(&code) {
            CloseDisposition::Unauthorized
        } else {
            CloseDisposition::Failed
        }
    }

    /// Classify an HTTP status that refused the handshake.
    pub fn classify_http_status(&self, status: u16) -> CloseDisposition {
        if self.unauthorized_http_statuses.contains(&status) {
            CloseDisposition::Unauthorized
        } else {
            CloseDisposition::Failed
        }
    }
}

/// Identity of one opened connection. Strictly increasing per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a closed connection should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// The remote rejected the viewer key.
    Unauthorized,
    /// Any other close or transport failure.
    Failed,
}

impl CloseDisposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Failed => "failed",
        }
    }
}

/// Event reported by a connection task, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Handshake succeeded.
    Opened { id: ConnectionId },
    /// A text frame (binary frames are decoded as UTF-8).
    Frame { id: ConnectionId, text: String },
    /// Transport fault, as a display-ready message. Always followed by `Closed`.
    TransportError { id: ConnectionId, message: String },
    /// The connection is gone. Not reported for connections closed locally.
    Closed {
        id: ConnectionId,
        code: u16,
        reason: String,
        disposition: CloseDisposition,
    },
}

impl ConnectionEvent {
    pub fn id(&self) -> ConnectionId {
        match self {
            Self::Opened { id }
            | Self::Frame { id, .. }
            | Self::TransportError { id, .. }
            | Self::Closed { id, .. } => *id,
        }
    }
}

/// Build the stream URL for a viewer key.
///
/// The key is form-encoded into the `token` query parameter, after any query
/// the base URL already carries.
pub fn build_stream_url(base: &str, key: &ViewerKey) -> WsResult<String> {
    let base = base.trim();
    // Parse errors only ever mention the base, never the key.
    let mut url =
        Url::parse(base).map_err(|e| WsError::InvalidUrl(format!("{base}: {e}")))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(WsError::InvalidUrl(format!(
            "expected ws:// or wss:// scheme: {base}"
        )));
    }
    if url.fragment().is_some() {
        return Err(WsError::InvalidUrl(format!(
            "fragments are not allowed: {base}"
        )));
    }

    url.query_pairs_mut().append_pair("token", key.expose());
    Ok(url.into())
}

struct ActiveConnection {
    id: ConnectionId,
    shutdown_token: CancellationToken,
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    event_tx: mpsc::Sender<ConnectionEvent>,
    next_id: u64,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<ConnectionEvent>) -> Self {
        Self {
            config,
            event_tx,
            next_id: 0,
            active: None,
        }
    }

    /// Open a stream for `key`, tearing down any previous connection first.
    ///
    /// Must be called from within a tokio runtime; outside one this returns
    /// an error instead of panicking.
    pub fn open(&mut self, key: &ViewerKey) -> WsResult<ConnectionId> {
        self.close();

        let url = build_stream_url(&self.config.url, key)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WsError::ConnectionFailed(format!("no async runtime: {e}")))?;

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        let shutdown_token = CancellationToken::new();

        info!(
            connection_id = %id,
            url = %self.config.url,
            key = %key,
            "Opening stream connection"
        );

        let task = ConnectionTask {
            id,
            url,
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            shutdown_token: shutdown_token.clone(),
        };
        runtime.spawn(task.run());

        self.active = Some(ActiveConnection { id, shutdown_token });
        Ok(id)
    }

    /// Request graceful termination of the active connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            info!(connection_id = %active.id, "Closing stream connection");
            active.shutdown_token.cancel();
        }
    }

    /// Forget the active connection once its `Closed` event has been handled.
    pub fn release(&mut self, id: ConnectionId) {
        if self.is_current(id) {
            self.active = None;
        }
    }

    /// Whether `id` is the live connection (events from others are stale).
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == id)
    }

    pub fn active_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|a| a.id)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// One connection's read loop.
struct ConnectionTask {
    id: ConnectionId,
    url: String,
    config: ConnectionConfig,
    event_tx: mpsc::Sender<ConnectionEvent>,
    shutdown_token: CancellationToken,
}

impl ConnectionTask {
    async fn run(self) {
        let id = self.id;

        // TCP_NODELAY: frames are small and latency-sensitive
        let connect = tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => {
                debug!(connection_id = %id, "Connection cancelled during handshake");
                return;
            }
            result = connect_async_tls_with_config(self.url.as_str(), None, true, None) => result,
        };

        let ws_stream = match connect {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                self.report_connect_failure(e).await;
                return;
            }
        };

        info!(connection_id = %id, "Stream connected");
        if !self.emit(ConnectionEvent::Opened { id }).await {
            return;
        }

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    debug!(connection_id = %id, "Shutdown requested, sending Close frame");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(connection_id = %id, ?e, "Failed to send Close frame");
                    }
                    return;
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !self.emit(ConnectionEvent::Frame { id, text }).await {
                                return;
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            let text = String::from_utf8_lossy(&data).into_owned();
                            if !self.emit(ConnectionEvent::Frame { id, text }).await {
                                return;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!(connection_id = %id, "Received ping, sending pong");
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                warn!(connection_id = %id, ?e, "Failed to send pong");
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((CLOSE_NO_STATUS, String::new()));
                            warn!(connection_id = %id, code, %reason, "Stream closed by server");
                            // Flushes the queued close reply
                            let _ = write.close().await;
                            self.emit_closed(code, reason).await;
                            return;
                        }
                        Some(Err(e)) => {
                            error!(connection_id = %id, ?e, "Stream read error");
                            self.emit(ConnectionEvent::TransportError {
                                id,
                                message: format!("WebSocket error encountered: {e}"),
                            })
                            .await;
                            self.emit_closed(CLOSE_ABNORMAL, e.to_string()).await;
                            return;
                        }
                        None => {
                            warn!(connection_id = %id, "Stream ended without close frame");
                            self.emit_closed(CLOSE_ABNORMAL, "stream ended".to_string())
                                .await;
                            return;
                        }
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    async fn report_connect_failure(&self, e: tungstenite::Error) {
        let id = self.id;
        let message = format!("Failed to open WebSocket: {e}");

        let (code, reason, disposition) = match &e {
            tungstenite::Error::Http(response) => {
                let status = response.status().as_u16();
                let disposition = self.config.classify_http_status(status);
                let code = match disposition {
                    CloseDisposition::Unauthorized => CLOSE_POLICY_VIOLATION,
                    CloseDisposition::Failed => CLOSE_ABNORMAL,
                };
                (code, format!("handshake refused with HTTP {status}"), disposition)
            }
            _ => (CLOSE_ABNORMAL, e.to_string(), CloseDisposition::Failed),
        };

        error!(connection_id = %id, %reason, "Stream handshake failed");
        if self
            .emit(ConnectionEvent::TransportError { id, message })
            .await
        {
            self.emit(ConnectionEvent::Closed {
                id,
                code,
                reason,
                disposition,
            })
            .await;
        }
    }

    async fn emit_closed(&self, code: u16, reason: String) {
        let disposition = self.config.classify_close(code);
        self.emit(ConnectionEvent::Closed {
            id: self.id,
            code,
            reason,
            disposition,
        })
        .await;
    }

    /// Forward an event. Returns `false` once the consumer is gone.
    async fn emit(&self, event: ConnectionEvent) -> bool {
        if self.shutdown_token.is_cancelled() {
            return false;
        }
        if self.event_tx.send(event).await.is_err() {
            warn!(connection_id = %self.id, "Event receiver dropped");
            return false;
        }
        true
    }
}
