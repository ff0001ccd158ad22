//! WebSocket stream client for the Hunter live console.
//!
//! Provides:
//! - A connection manager owning at most one live stream, keyed by the viewer key
//! - Close classification (authentication rejection vs. other failures)
//! - Decoding of wire frames into a per-topic tagged union
//!
//! There is no automatic reconnection: a new connection is only opened when
//! the console submits a credential again.

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{
    build_stream_url, CloseDisposition, ConnectionConfig, ConnectionEvent, ConnectionId,
    ConnectionManager, CLOSE_ABNORMAL, CLOSE_NO_STATUS, CLOSE_POLICY_VIOLATION,
};
pub use error::{WsError, WsResult};
pub use message::StreamFrame;
