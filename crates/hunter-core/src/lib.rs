//! Core domain types for the Hunter live console.
//!
//! This crate provides the types shared by every other hunter crate:
//! - `ViewerKey`: the viewer credential, masked for display and zeroised on drop
//! - `ConnectionState`: the stream connection state machine
//! - `BoundedLog`: fixed-capacity deque with deterministic eviction
//! - `LogEntry`, `DetectionEntry`, `LogLevel`: records shown by the console

pub mod bounded;
pub mod connection_state;
pub mod credential;
pub mod error;
pub mod types;

pub use bounded::BoundedLog;
pub use connection_state::{ConnectionState, ConnectionTrigger};
pub use credential::{mask_credential, ViewerKey, MASK_CHAR, VISIBLE_SUFFIX_LEN};
pub use error::{CoreError, Result};
pub use types::{now_ms, DetectionEntry, LogEntry, LogLevel, MAX_DETECTIONS, MAX_LOGS};
