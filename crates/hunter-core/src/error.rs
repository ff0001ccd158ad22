//! Error types for hunter-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Viewer key must not be empty")]
    EmptyCredential,
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
