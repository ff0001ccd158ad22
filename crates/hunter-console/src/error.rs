//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<hunter_ws::WsError>),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] hunter_dashboard::DashboardError),
}

pub type AppResult<T> = Result<T, AppError>;
