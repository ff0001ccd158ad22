//! Message routing.
//!
//! Decodes each inbound frame once and applies at most one side effect to
//! the console state. Routing never fails: malformed input degrades to an
//! `error` log line and never touches the connection state.

use std::sync::atomic::{AtomicU64, Ordering};

use hunter_core::LogLevel;
use hunter_ws::{StreamFrame, WsError};
use tracing::trace;

use crate::console_state::ConsoleState;

/// What routing one frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A detection was stored (and logged).
    Detection { amm: String },
    /// A log line was appended. `kind` is the frame kind (`log`, `news`, ...).
    Logged { kind: &'static str },
    /// Heartbeat time recorded.
    Heartbeat,
    /// No topic; nothing happened.
    Ignored,
    /// Not JSON; an error line was appended.
    ParseError,
}

impl RouteOutcome {
    /// Bounded label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Detection { .. } => "detection",
            Self::Logged { kind } => *kind,
            Self::Heartbeat => "heartbeat",
            Self::Ignored => "ignored",
            Self::ParseError => "invalid",
        }
    }
}

/// Routing counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    pub frames: AtomicU64,
    pub detections: AtomicU64,
    pub ignored: AtomicU64,
    pub parse_errors: AtomicU64,
}

impl RouterStats {
    fn record(&self, outcome: &RouteOutcome) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            RouteOutcome::Detection { .. } => &self.detections,
            RouteOutcome::Ignored => &self.ignored,
            RouteOutcome::ParseError => &self.parse_errors,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn detections(&self) -> u64 {
        self.detections.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }
}

/// Routes stream frames into the console state.
#[derive(Debug, Default)]
pub struct MessageRouter {
    stats: RouterStats,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Decode and route one raw text frame.
    pub fn route_raw(&self, text: &str, state: &mut ConsoleState, now_ms: i64) -> RouteOutcome {
        let outcome = match StreamFrame::parse(text, now_ms) {
            Ok(Some(frame)) => Self::apply(frame, state, now_ms),
            Ok(None) => {
                trace!("Frame without topic ignored");
                RouteOutcome::Ignored
            }
            Err(e) => {
                let reason = match e {
                    WsError::ParseError(reason) => reason,
                    other => other.to_string(),
                };
                state.append_log(
                    LogLevel::Error,
                    format!("Failed to parse message: {reason}"),
                    now_ms,
                );
                RouteOutcome::ParseError
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    fn apply(frame: StreamFrame, state: &mut ConsoleState, now_ms: i64) -> RouteOutcome {
        let kind = frame.kind();
        let line = frame.log_line();

        let outcome = match frame {
            StreamFrame::Heartbeat => {
                state.record_heartbeat(now_ms);
                return RouteOutcome::Heartbeat;
            }
            StreamFrame::Detection(detection) => {
                let amm = detection.amm.clone();
                state.add_detection(detection);
                RouteOutcome::Detection { amm }
            }
            _ => RouteOutcome::Logged { kind },
        };

        if let Some((level, message)) = line {
            state.append_log(level, message, now_ms);
        }
        outcome
    }
}
