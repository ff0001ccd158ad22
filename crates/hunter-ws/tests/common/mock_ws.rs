//! Mock stream server for integration tests.
//!
//! Accepts WebSocket connections, records the `token` each client presented,
//! plays a fixed script of frames, then ends the connection the way the
//! script says (hold open, close with a code, or drop the TCP stream).

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

/// What the server does after the handshake.
#[derive(Debug, Clone)]
pub enum Ending {
    /// Keep the connection open until the client leaves.
    Hold,
    /// Send a Close frame with this code.
    Close(u16),
    /// Drop the TCP stream without a Close frame.
    Drop,
}

/// Per-connection behaviour.
#[derive(Debug, Clone)]
pub struct Script {
    pub frames: Vec<String>,
    pub ending: Ending,
    /// Refuse the handshake with this HTTP status instead of upgrading.
    pub reject_status: Option<u16>,
}

impl Script {
    pub fn hold(frames: Vec<String>) -> Self {
        Self {
            frames,
            ending: Ending::Hold,
            reject_status: None,
        }
    }

    pub fn close_with(frames: Vec<String>, code: u16) -> Self {
        Self {
            frames,
            ending: Ending::Close(code),
            reject_status: None,
        }
    }

    pub fn reject_handshake(status: u16) -> Self {
        Self {
            frames: Vec::new(),
            ending: Ending::Hold,
            reject_status: Some(status),
        }
    }
}

/// A mock stream server for testing.
pub struct MockStreamServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    tokens: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicU32>,
    live: Arc<AtomicU32>,
}

impl MockStreamServer {
    /// Start a new server on an available port.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicU32::new(0));
        let live = Arc::new(AtomicU32::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let ctx = ConnCtx {
            script: Arc::new(script),
            tokens: tokens.clone(),
            accepted: accepted.clone(),
            live: live.clone(),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(stream, ctx.clone()));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            tokens,
            accepted,
            live,
        }
    }

    /// Base stream URL (no query).
    pub fn url(&self) -> String {
        format!("ws://{}/stream", self.addr)
    }

    /// Raw (still form-encoded) tokens, in connection order.
    pub async fn tokens(&self) -> Vec<String> {
        self.tokens.lock().await.clone()
    }

    /// Completed handshakes so far.
    pub fn accepted(&self) -> u32 {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn live(&self) -> u32 {
        self.live.load(Ordering::SeqCst)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[derive(Clone)]
struct ConnCtx {
    script: Arc<Script>,
    tokens: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicU32>,
    live: Arc<AtomicU32>,
}

async fn handle_connection(stream: TcpStream, ctx: ConnCtx) {
    let (token_tx, mut token_rx) = mpsc::unbounded_channel::<String>();
    let reject_status = ctx.script.reject_status;

    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let token = req
            .uri()
            .query()
            .unwrap_or("")
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .unwrap_or("")
            .to_string();
        let _ = token_tx.send(token);

        match reject_status {
            Some(status) => {
                let mut err = ErrorResponse::new(Some("rejected".to_string()));
                *err.status_mut() = StatusCode::from_u16(status).unwrap();
                Err(err)
            }
            None => Ok(resp),
        }
    };

    let handshake = accept_hdr_async(stream, callback).await;
    if let Ok(token) = token_rx.try_recv() {
        ctx.tokens.lock().await.push(token);
    }
    let ws_stream = match handshake {
        Ok(ws) => ws,
        Err(_) => return,
    };

    ctx.accepted.fetch_add(1, Ordering::SeqCst);
    ctx.live.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws_stream.split();

    for frame in &ctx.script.frames {
        if write.send(Message::Text(frame.clone())).await.is_err() {
            ctx.live.fetch_sub(1, Ordering::SeqCst);
            return;
        }
    }

    match ctx.script.ending {
        Ending::Drop => {
            drop(write);
            drop(read);
            ctx.live.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        Ending::Close(code) => {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: "closed by mock".into(),
            };
            let _ = write.send(Message::Close(Some(frame))).await;
        }
        Ending::Hold => {}
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
    ctx.live.fetch_sub(1, Ordering::SeqCst);
}
