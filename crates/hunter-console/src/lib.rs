//! Hunter live streaming console.
//!
//! Wires the components together:
//! - Credential store (viewer key persistence)
//! - Connection manager (one stream keyed by the viewer key)
//! - Message router into the bounded console stores
//! - Local dashboard for rendering and key entry

pub mod app;
pub mod config;
pub mod console;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use console::Console;
pub use error::{AppError, AppResult};
