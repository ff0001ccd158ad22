//! Message routing and console state for the Hunter live console.
//!
//! Routes decoded stream frames into a render-facing [`ConsoleState`]: two
//! bounded logs (detections and diagnostic lines), connection status, the
//! masked credential and the last heartbeat.

pub mod command;
pub mod console_state;
pub mod heartbeat;
pub mod router;

pub use command::ConsoleCommand;
pub use console_state::{ConsoleSnapshot, ConsoleState, SharedConsoleState};
pub use heartbeat::HeartbeatTracker;
pub use router::{MessageRouter, RouteOutcome, RouterStats};
