//! Render-facing console state.
//!
//! Written only by the console actor; the rendering layer reads it through
//! [`ConsoleState::snapshot`]. Every mutation bumps `version` so readers can
//! cheaply detect changes.

use std::sync::Arc;

use hunter_core::{
    BoundedLog, ConnectionState, ConnectionTrigger, DetectionEntry, LogEntry, LogLevel,
    MAX_DETECTIONS, MAX_LOGS,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::heartbeat::HeartbeatTracker;

/// Shared handle to the console state.
pub type SharedConsoleState = Arc<RwLock<ConsoleState>>;

/// Console state.
#[derive(Debug)]
pub struct ConsoleState {
    connection_state: ConnectionState,
    /// Diagnostic lines, oldest first.
    logs: BoundedLog<LogEntry>,
    /// Detections, newest first.
    detections: BoundedLog<DetectionEntry>,
    heartbeat: HeartbeatTracker,
    masked_key: Option<String>,
    key_notice: Option<String>,
    credential_rejected: bool,
    version: u64,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::with_capacities(MAX_LOGS, MAX_DETECTIONS)
    }

    pub fn with_capacities(max_logs: usize, max_detections: usize) -> Self {
        Self {
            connection_state: ConnectionState::Idle,
            logs: BoundedLog::new(max_logs),
            detections: BoundedLog::new(max_detections),
            heartbeat: HeartbeatTracker::new(),
            masked_key: None,
            key_notice: None,
            credential_rejected: false,
            version: 0,
        }
    }

    /// Wrap in a shared handle.
    pub fn shared(self) -> SharedConsoleState {
        Arc::new(RwLock::new(self))
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// Apply a state machine trigger.
    ///
    /// Returns the new state, or `None` when the transition is not allowed
    /// (the state is left untouched).
    pub fn transition(&mut self, trigger: ConnectionTrigger) -> Option<ConnectionState> {
        let from = self.connection_state;
        match from.next(trigger) {
            Some(to) => {
                if to != from {
                    debug!(%from, %to, ?trigger, "Connection state changed");
                }
                self.connection_state = to;
                self.touch();
                Some(to)
            }
            None => {
                trace!(state = %from, ?trigger, "Ignored transition");
                None
            }
        }
    }

    /// Append a diagnostic line and mirror it to tracing.
    pub fn append_log(&mut self, level: LogLevel, message: impl Into<String>, now_ms: i64) {
        let entry = LogEntry::new(now_ms, level, message);
        match entry.level {
            LogLevel::Info => info!(target: "hunter::stream", "{}", entry.message),
            LogLevel::Warning => warn!(target: "hunter::stream", "{}", entry.message),
            LogLevel::Error => error!(target: "hunter::stream", "{}", entry.message),
            LogLevel::Debug => debug!(target: "hunter::stream", "{}", entry.message),
        }
        self.logs.append(entry);
        self.touch();
    }

    /// Insert a detection at the front.
    pub fn add_detection(&mut self, detection: DetectionEntry) {
        self.detections.prepend(detection);
        self.touch();
    }

    pub fn record_heartbeat(&mut self, now_ms: i64) {
        self.heartbeat.record(now_ms);
        self.touch();
    }

    /// Drop logs, detections and heartbeat (a new credential starts fresh).
    pub fn reset_streams(&mut self) {
        self.logs.clear();
        self.detections.clear();
        self.heartbeat.reset();
        self.touch();
    }

    /// Masked credential for display, `None` when no credential is held.
    pub fn set_masked_key(&mut self, masked: Option<String>) {
        self.masked_key = masked;
        self.touch();
    }

    /// Replace the current notice (at most one is shown).
    pub fn set_notice(&mut self, notice: Option<String>) {
        self.key_notice = notice;
        self.touch();
    }

    pub fn set_credential_rejected(&mut self, rejected: bool) {
        self.credential_rejected = rejected;
        self.touch();
    }

    pub fn logs(&self) -> &BoundedLog<LogEntry> {
        &self.logs
    }

    pub fn detections(&self) -> &BoundedLog<DetectionEntry> {
        &self.detections
    }

    pub fn heartbeat(&self) -> &HeartbeatTracker {
        &self.heartbeat
    }

    pub fn masked_key(&self) -> Option<&str> {
        self.masked_key.as_deref()
    }

    pub fn key_notice(&self) -> Option<&str> {
        self.key_notice.as_deref()
    }

    pub fn credential_rejected(&self) -> bool {
        self.credential_rejected
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Owned copy for rendering.
    pub fn snapshot(&self, now_ms: i64) -> ConsoleSnapshot {
        ConsoleSnapshot {
            timestamp_ms: now_ms,
            version: self.version,
            connection_state: self.connection_state,
            label: self.connection_state.label().to_string(),
            masked_key: self.masked_key.clone(),
            key_notice: self.key_notice.clone(),
            credential_rejected: self.credential_rejected,
            last_heartbeat_ms: self.heartbeat.last_ms(),
            heartbeat_age_secs: self.heartbeat.age_secs(now_ms),
            detections: self.detections.snapshot(),
            logs: self.logs.snapshot(),
        }
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// Point-in-time view of the console. Never contains the raw credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSnapshot {
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub version: u64,
    pub connection_state: ConnectionState,
    /// Badge label.
    pub label: String,
    pub masked_key: Option<String>,
    pub key_notice: Option<String>,
    pub credential_rejected: bool,
    pub last_heartbeat_ms: Option<i64>,
    pub heartbeat_age_secs: Option<u64>,
    /// Newest first.
    pub detections: Vec<DetectionEntry>,
    /// Oldest first.
    pub logs: Vec<LogEntry>,
}
