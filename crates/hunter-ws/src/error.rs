//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Message parse error: {0}")]
    ParseError(String),
}

pub type WsResult<T> = Result<T, WsError>;
