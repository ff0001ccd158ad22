//! HTTP server implementation using axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use hunter_feed::ConsoleCommand;
use hunter_telemetry::Metrics;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::DashboardResult;
use crate::state::DashboardState;
use crate::types::{CommandAccepted, DashboardMessage, SubmitKeyRequest};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot; the slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        if self.config.auth_enabled() && !check_basic_auth(headers, &self.config) {
            return Err(unauthorized_response());
        }
        Ok(())
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/snapshot", get(get_snapshot))
        .route(
            "/api/viewer-key",
            post(submit_key).delete(clear_key),
        )
        .route("/ws", get(ws_handler))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Serve the index HTML page.
async fn serve_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<&'static str>, Response> {
    state.authorize(&headers)?;
    Ok(Html(include_str!("../static/index.html")))
}

/// Get current state snapshot as JSON.
async fn get_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<hunter_feed::ConsoleSnapshot>, Response> {
    state.authorize(&headers)?;
    Ok(Json(state.dashboard_state.collect_snapshot()))
}

/// Submit a viewer key. Validation happens in the console.
async fn submit_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SubmitKeyRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = state.authorize(&headers) {
        return resp;
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected viewer key request");
            return (StatusCode::BAD_REQUEST, rejection.body_text()).into_response();
        }
    };

    forward(&state, ConsoleCommand::SubmitKey(request.key)).await
}

/// Clear the stored viewer key.
async fn clear_key(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = state.authorize(&headers) {
        return resp;
    }
    forward(&state, ConsoleCommand::ClearKey).await
}

async fn forward(state: &AppState, command: ConsoleCommand) -> Response {
    if state.dashboard_state.send_command(command).await {
        (StatusCode::ACCEPTED, Json(CommandAccepted::new())).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Console is not running").into_response()
    }
}

/// Prometheus text exposition.
async fn get_metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = state.authorize(&headers) {
        return resp;
    }
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(resp) = state.authorize(&headers) {
        return resp;
    }

    let Some(guard) = state.connection_limiter.try_acquire() else {
        warn!(
            current = state.connection_limiter.current_count(),
            max = state.config.max_connections,
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    Metrics::dashboard_client_connected();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so no change falls in between
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let initial_msg = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial snapshot, client disconnected");
            Metrics::dashboard_client_disconnected();
            return;
        }
    }

    // Incoming side only watches for close (axum answers pings)
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    Metrics::dashboard_client_disconnected();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Check basic authentication.
fn check_basic_auth(headers: &HeaderMap, config: &DashboardConfig) -> bool {
    let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let Some(encoded) = auth_str.strip_prefix("Basic ") else {
        return false;
    };

    let Some(decoded) = BASE64
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    decoded == format!("{}:{}", config.username, config.password)
}

/// Create an unauthorized response.
fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Hunter\"")],
        "Unauthorized",
    )
        .into_response()
}

/// Run the dashboard HTTP server until `shutdown` is cancelled.
pub async fn run_server(
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let addr = config.socket_addr()?;

    // Buffer for slow clients: 32 updates
    let (broadcast_tx, _) = broadcast::channel::<String>(32);

    let state = AppState::new(dashboard_state.clone(), broadcast_tx.clone(), config.clone());
    let app = create_router(state);

    tokio::spawn(crate::broadcast::run_broadcaster(
        dashboard_state,
        broadcast_tx,
        config.update_interval_ms,
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Starting dashboard server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}
