//! Console actor.
//!
//! Owns the credential store, the connection manager, the router and the
//! write side of the console state. The key itself is not retained: the
//! connection task holds the URL it was opened with and the `ViewerKey` is
//! zeroised once the connection is requested.
//!
//! Connection events and human commands are handled one at a time, in
//! arrival order, so store mutations never interleave.

use hunter_core::{now_ms, ConnectionState, ConnectionTrigger, LogLevel, ViewerKey};
use hunter_feed::{ConsoleCommand, ConsoleState, MessageRouter, RouteOutcome, SharedConsoleState};
use hunter_persistence::CredentialStore;
use hunter_telemetry::Metrics;
use hunter_ws::{
    CloseDisposition, ConnectionConfig, ConnectionEvent, ConnectionId, ConnectionManager,
    CLOSE_NO_STATUS,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub const NOTICE_KEY_REQUIRED: &str = "Viewer key required. Enter your key to connect.";
pub const NOTICE_ENTER_KEY: &str = "Enter your viewer key to connect.";
pub const NOTICE_KEY_CLEARED: &str = "Viewer key cleared. Enter a key to reconnect.";
pub const NOTICE_KEY_REJECTED: &str = "Viewer key rejected; please verify and re-enter your key.";

pub const LOG_CONNECTED: &str = "WebSocket connection established.";
pub const LOG_KEY_REJECTED: &str = "Viewer key rejected by hunter backend.";

/// The console actor.
pub struct Console {
    state: SharedConsoleState,
    store: Box<dyn CredentialStore>,
    connections: ConnectionManager,
    events: mpsc::Receiver<ConnectionEvent>,
    router: MessageRouter,
}

impl Console {
    pub fn new(
        config: ConnectionConfig,
        store: Box<dyn CredentialStore>,
        event_buffer: usize,
    ) -> Self {
        let (event_tx, events) = mpsc::channel(event_buffer.max(1));
        Metrics::connection_state_set(ConnectionState::Idle);
        Self {
            state: ConsoleState::new().shared(),
            store,
            connections: ConnectionManager::new(config, event_tx),
            events,
            router: MessageRouter::new(),
        }
    }

    /// Shared handle for the rendering layer.
    pub fn state(&self) -> SharedConsoleState {
        self.state.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().connection_state()
    }

    pub fn active_connection(&self) -> Option<ConnectionId> {
        self.connections.active_id()
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Start-up: connect with the stored key, or ask for one.
    pub fn restore(&mut self) {
        match self.store.load() {
            Some(key) => {
                info!(key = %key, "Restored viewer key");
                self.connect(key);
            }
            None => {
                info!("No stored viewer key");
                self.state
                    .write()
                    .set_notice(Some(NOTICE_KEY_REQUIRED.to_string()));
            }
        }
    }

    /// A human submitted a key.
    ///
    /// Empty input drops the in-use key and closes any live stream, which is
    /// then reported like a close without status. The stored key is left
    /// untouched.
    pub fn submit_key(&mut self, raw: &str) {
        let key = match ViewerKey::parse(raw) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Rejected viewer key submission");
                Metrics::credential_submitted("empty");
                self.drop_live_key();
                return;
            }
        };

        Metrics::credential_submitted("accepted");
        if let Err(e) = self.store.save(&key) {
            warn!(error = %e, "Failed to persist viewer key, connecting anyway");
        }
        self.connect(key);
    }

    /// Forget the key and disconnect.
    pub fn clear_key(&mut self) {
        self.connections.close();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to remove stored viewer key");
        }

        {
            let mut state = self.state.write();
            state.transition(ConnectionTrigger::CredentialCleared);
            state.set_masked_key(None);
            state.set_credential_rejected(false);
            state.set_notice(Some(NOTICE_KEY_CLEARED.to_string()));
        }
        info!("Viewer key cleared");
        self.sync_metrics();
    }

    pub fn handle_command(&mut self, command: ConsoleCommand) {
        debug!(?command, "Console command");
        match command {
            ConsoleCommand::SubmitKey(raw) => self.submit_key(&raw),
            ConsoleCommand::ClearKey => self.clear_key(),
        }
    }

    /// Apply one connection event. Events from superseded connections are dropped.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        let id = event.id();
        if !self.connections.is_current(id) {
            trace!(connection_id = %id, "Dropping event from superseded connection");
            return;
        }

        let now = now_ms();
        match event {
            ConnectionEvent::Opened { .. } => {
                let mut state = self.state.write();
                state.transition(ConnectionTrigger::HandshakeSucceeded);
                state.append_log(LogLevel::Info, LOG_CONNECTED, now);
            }
            ConnectionEvent::Frame { text, .. } => {
                let outcome = {
                    let mut state = self.state.write();
                    self.router.route_raw(&text, &mut state, now)
                };
                Metrics::frame_routed(outcome.kind());
                match &outcome {
                    RouteOutcome::Detection { amm } => {
                        trace!(connection_id = %id, %amm, "Detection routed");
                        Metrics::detection();
                    }
                    RouteOutcome::ParseError => Metrics::parse_error(),
                    _ => {}
                }
            }
            ConnectionEvent::TransportError { message, .. } => {
                self.state.write().append_log(LogLevel::Error, message, now);
            }
            ConnectionEvent::Closed {
                code,
                reason,
                disposition,
                ..
            } => {
                self.connections.release(id);
                Metrics::connection_closed(disposition.as_str());
                info!(connection_id = %id, code, %reason, disposition = disposition.as_str(), "Stream closed");

                let mut state = self.state.write();
                match disposition {
                    CloseDisposition::Unauthorized => {
                        state.transition(ConnectionTrigger::RejectedByRemote);
                        state.append_log(LogLevel::Error, LOG_KEY_REJECTED, now);
                        state.set_notice(Some(NOTICE_KEY_REJECTED.to_string()));
                        state.set_credential_rejected(true);
                    }
                    CloseDisposition::Failed => {
                        state.append_log(
                            LogLevel::Warning,
                            format!("Connection closed (code {code})."),
                            now,
                        );
                        state.transition(ConnectionTrigger::Failed);
                    }
                }
            }
        }
        self.sync_metrics();
    }

    /// Run until shutdown is requested or every command sender is gone.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ConsoleCommand>,
        shutdown: CancellationToken,
    ) {
        info!("Console running");
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                Some(event) = self.events.recv() => self.handle_event(event),

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("Command channel closed");
                        break;
                    }
                },
            }
        }
        self.connections.close();
        info!("Console stopped");
    }

    /// Tear down the old stream and open a new one for `key`.
    fn connect(&mut self, key: ViewerKey) {
        {
            let mut state = self.state.write();
            state.reset_streams();
            state.set_notice(None);
            state.set_credential_rejected(false);
            state.set_masked_key(Some(key.masked()));
            state.transition(ConnectionTrigger::CredentialSubmitted);
        }

        match self.connections.open(&key) {
            Ok(id) => {
                Metrics::connection_opened();
                debug!(connection_id = %id, "Connection requested");
            }
            Err(e) => {
                let mut state = self.state.write();
                state.append_log(
                    LogLevel::Error,
                    format!("Failed to open WebSocket: {e}"),
                    now_ms(),
                );
                state.transition(ConnectionTrigger::Failed);
            }
        }
        self.sync_metrics();
    }

    /// Empty submission: forget the key in use and close the live stream.
    fn drop_live_key(&mut self) {
        let was_live = self.connections.active_id().is_some();
        self.connections.close();

        {
            let mut state = self.state.write();
            state.set_notice(Some(NOTICE_ENTER_KEY.to_string()));
            state.set_masked_key(None);
            if was_live {
                state.append_log(
                    LogLevel::Warning,
                    format!("Connection closed (code {CLOSE_NO_STATUS})."),
                    now_ms(),
                );
                state.transition(ConnectionTrigger::Failed);
            }
        }
        self.sync_metrics();
    }

    fn sync_metrics(&self) {
        let state = self.state.read();
        Metrics::connection_state_set(state.connection_state());
        Metrics::store_lengths(state.logs().len(), state.detections().len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunter_persistence::{MemoryCredentialStore, PersistenceError, PersistenceResult};
    use mockall::mock;
    use mockall::predicate::function;

    mock! {
        pub Store {}
        impl CredentialStore for Store {
            fn load(&self) -> Option<ViewerKey>;
            fn save(&mut self, key: &ViewerKey) -> PersistenceResult<()>;
            fn clear(&mut self) -> PersistenceResult<()>;
        }
    }

    // Nothing listens here; connections are driven by hand-made events.
    fn unreachable_config() -> ConnectionConfig {
        ConnectionConfig {
            url: "ws://127.0.0.1:1/stream".to_string(),
            ..Default::default()
        }
    }

    fn console_with(store: impl CredentialStore + 'static) -> Console {
        Console::new(unreachable_config(), Box::new(store), 64)
    }

    fn closed(id: ConnectionId, code: u16, disposition: CloseDisposition) -> ConnectionEvent {
        ConnectionEvent::Closed {
            id,
            code,
            reason: String::new(),
            disposition,
        }
    }

    fn last_log(console: &Console) -> (LogLevel, String) {
        let state = console.state();
        let state = state.read();
        let entry = state.logs().back().unwrap();
        (entry.level, entry.message.clone())
    }

    #[test]
    fn test_empty_submit_never_saves_or_connects() {
        let mut store = MockStore::new();
        store.expect_save().never();
        let mut console = console_with(store);

        console.submit_key("");
        console.submit_key("   \t");

        assert_eq!(console.connection_state(), ConnectionState::Idle);
        assert_eq!(console.active_connection(), None);
        let state = console.state();
        assert_eq!(state.read().key_notice(), Some(NOTICE_ENTER_KEY));
        assert_eq!(state.read().masked_key(), None);
    }

    #[tokio::test]
    async fn test_empty_submit_closes_live_stream_but_keeps_stored_key() {
        let mut store = MockStore::new();
        store.expect_save().times(1).returning(|_| Ok(()));
        store.expect_clear().never();
        let mut console = console_with(store);

        console.submit_key("alpha");
        let id = console.active_connection().unwrap();
        console.handle_event(ConnectionEvent::Opened { id });

        console.submit_key("   ");
        assert_eq!(console.active_connection(), None);
        assert_eq!(console.connection_state(), ConnectionState::Error);
        assert_eq!(
            last_log(&console),
            (LogLevel::Warning, "Connection closed (code 1005).".to_string())
        );
        let snap = console.state().read().snapshot(0);
        assert_eq!(snap.masked_key, None);
        assert_eq!(snap.key_notice.as_deref(), Some(NOTICE_ENTER_KEY));

        // The closed stream's own events no longer count
        console.handle_event(closed(id, 1000, CloseDisposition::Failed));
        assert_eq!(console.state().read().logs().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_saves_and_connects() {
        let mut store = MockStore::new();
        store
            .expect_save()
            .with(function(|k: &ViewerKey| k.expose() == "alpha-2025"))
            .times(1)
            .returning(|_| Ok(()));
        let mut console = console_with(store);

        console.submit_key("  alpha-2025 ");

        assert_eq!(console.connection_state(), ConnectionState::Connecting);
        assert!(console.active_connection().is_some());
        let snap = console.state().read().snapshot(0);
        assert_eq!(snap.masked_key.as_deref(), Some("******2025"));
        assert_eq!(snap.key_notice, None);
        assert_eq!(snap.label, "Connecting...");
    }

    #[tokio::test]
    async fn test_failed_save_still_connects() {
        let mut store = MockStore::new();
        store.expect_save().times(1).returning(|_| {
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        });
        let mut console = console_with(store);

        console.submit_key("alpha");
        assert_eq!(console.connection_state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_auth_rejection() {
        let mut console = console_with(MemoryCredentialStore::new());
        console.submit_key("revoked-key");
        let id = console.active_connection().unwrap();

        console.handle_event(ConnectionEvent::Opened { id });
        assert_eq!(console.connection_state(), ConnectionState::Connected);

        console.handle_event(closed(id, 4403, CloseDisposition::Unauthorized));
        assert_eq!(console.connection_state(), ConnectionState::Unauthorized);
        assert_eq!(
            last_log(&console),
            (LogLevel::Error, LOG_KEY_REJECTED.to_string())
        );

        let snap = console.state().read().snapshot(0);
        assert_eq!(snap.key_notice.as_deref(), Some(NOTICE_KEY_REJECTED));
        assert!(snap.credential_rejected);
        assert_eq!(snap.masked_key.as_deref(), Some("*******-key"));

        // No reconnect until a new submission
        assert_eq!(console.active_connection(), None);
        console.handle_event(ConnectionEvent::Opened { id });
        assert_eq!(console.connection_state(), ConnectionState::Unauthorized);
    }

    #[tokio::test]
    async fn test_resubmit_after_rejection_resets_flags() {
        let mut console = console_with(MemoryCredentialStore::new());
        console.submit_key("bad");
        let id = console.active_connection().unwrap();
        console.handle_event(closed(id, 1008, CloseDisposition::Unauthorized));

        console.submit_key("good-key");
        let snap = console.state().read().snapshot(0);
        assert_eq!(snap.connection_state, ConnectionState::Connecting);
        assert!(!snap.credential_rejected);
        assert_eq!(snap.key_notice, None);
        assert!(snap.logs.is_empty());
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let mut console = console_with(MemoryCredentialStore::new());
        console.submit_key("first-key");
        let first = console.active_connection().unwrap();
        console.submit_key("second-key");
        let second = console.active_connection().unwrap();
        assert_ne!(first, second);

        console.handle_event(closed(first, 1006, CloseDisposition::Failed));
        console.handle_event(ConnectionEvent::Frame {
            id: first,
            text: r#"{"topic":"log","payload":{"message":"late"}}"#.to_string(),
        });
        assert_eq!(console.connection_state(), ConnectionState::Connecting);
        assert!(console.state().read().logs().is_empty());

        console.handle_event(ConnectionEvent::Opened { id: second });
        assert_eq!(console.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_failed_close_moves_to_error() {
        let mut console = console_with(MemoryCredentialStore::new());
        console.submit_key("alpha");
        let id = console.active_connection().unwrap();
        console.handle_event(ConnectionEvent::Opened { id });
        console.handle_event(ConnectionEvent::TransportError {
            id,
            message: "WebSocket error encountered: reset".to_string(),
        });
        console.handle_event(closed(id, 1006, CloseDisposition::Failed));

        assert_eq!(console.connection_state(), ConnectionState::Error);
        assert_eq!(
            last_log(&console),
            (LogLevel::Warning, "Connection closed (code 1006).".to_string())
        );
        assert_eq!(console.state().read().snapshot(0).label, "Disconnected");
    }

    #[tokio::test]
    async fn test_frames_are_routed() {
        let mut console = console_with(MemoryCredentialStore::new());
        console.submit_key("alpha");
        let id = console.active_connection().unwrap();
        console.handle_event(ConnectionEvent::Opened { id });

        let detection = serde_json::json!({
            "topic": "detection",
            "ts": 1700000000,
            "payload": {"amm": "RaydiumV4", "symbol": "FOO", "slot": 123, "tx_signature": "Sig1"}
        });
        console.handle_event(ConnectionEvent::Frame {
            id,
            text: detection.to_string(),
        });
        console.handle_event(ConnectionEvent::Frame {
            id,
            text: "not json".to_string(),
        });

        let snap = console.state().read().snapshot(0);
        assert_eq!(snap.connection_state, ConnectionState::Connected);
        assert_eq!(snap.detections.len(), 1);
        assert_eq!(snap.detections[0].ts_ms, 1_700_000_000_000);
        let messages: Vec<_> = snap.logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages[0], LOG_CONNECTED);
        assert_eq!(messages[1], "Detection: FOO on RaydiumV4");
        assert!(messages[2].starts_with("Failed to parse message: "));
        assert_eq!(console.router().stats().frames(), 2);
    }

    #[tokio::test]
    async fn test_clear_returns_to_idle_and_ignores_late_close() {
        let mut store = MockStore::new();
        store.expect_save().returning(|_| Ok(()));
        store.expect_clear().times(1).returning(|| Ok(()));
        let mut console = console_with(store);

        console.submit_key("alpha");
        let id = console.active_connection().unwrap();
        console.handle_event(ConnectionEvent::Opened { id });

        console.clear_key();
        assert_eq!(console.connection_state(), ConnectionState::Idle);
        assert_eq!(console.active_connection(), None);

        console.handle_event(closed(id, 1000, CloseDisposition::Failed));
        assert_eq!(console.connection_state(), ConnectionState::Idle);

        let snap = console.state().read().snapshot(0);
        assert_eq!(snap.masked_key, None);
        assert_eq!(snap.key_notice.as_deref(), Some(NOTICE_KEY_CLEARED));
    }

    #[test]
    fn test_restore_without_key_sets_notice() {
        let mut store = MockStore::new();
        store.expect_load().times(1).returning(|| None);
        let mut console = console_with(store);

        console.restore();
        assert_eq!(console.connection_state(), ConnectionState::Idle);
        assert_eq!(
            console.state().read().key_notice(),
            Some(NOTICE_KEY_REQUIRED)
        );
    }

    #[tokio::test]
    async fn test_restore_with_key_connects_without_saving() {
        let mut store = MockStore::new();
        store
            .expect_load()
            .times(1)
            .returning(|| ViewerKey::parse("stored-key").ok());
        store.expect_save().never();
        let mut console = console_with(store);

        console.restore();
        assert_eq!(console.connection_state(), ConnectionState::Connecting);
        assert!(console.active_connection().is_some());
    }

    #[tokio::test]
    async fn test_invalid_url_moves_to_error() {
        let config = ConnectionConfig {
            url: "https://not-a-stream".to_string(),
            ..Default::default()
        };
        let mut console = Console::new(config, Box::new(MemoryCredentialStore::new()), 8);

        console.submit_key("alpha");
        assert_eq!(console.connection_state(), ConnectionState::Error);
        let (level, message) = last_log(&console);
        assert_eq!(level, LogLevel::Error);
        assert!(message.starts_with("Failed to open WebSocket: "));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let console = console_with(MemoryCredentialStore::new());
        let state = console.state();
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(console.run(cmd_rx, shutdown.clone()));

        cmd_tx
            .send(ConsoleCommand::SubmitKey(String::new()))
            .await
            .unwrap();
        for _ in 0..100 {
            if state.read().key_notice().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(state.read().key_notice(), Some(NOTICE_ENTER_KEY));

        shutdown.cancel();
        handle.await.unwrap();
    }
}
