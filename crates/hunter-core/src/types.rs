//! Console record types.

use serde::{Deserialize, Serialize};

/// Capacity of the diagnostic log store.
pub const MAX_LOGS: usize = 200;

/// Capacity of the detection store.
pub const MAX_DETECTIONS: usize = 100;

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Severity of a console log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    /// Map a backend level name onto a canonical severity.
    ///
    /// Case-insensitive. `warn` and `warning` map to `Warning`, `trace` folds
    /// into `Debug`, anything unrecognised is `Info`.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "warn" | "warning" => Self::Warning,
            "error" => Self::Error,
            "debug" | "trace" => Self::Debug,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic line in the console log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Capture time (Unix milliseconds).
    #[serde(rename = "ts")]
    pub ts_ms: i64,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(ts_ms: i64, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            ts_ms,
            level,
            message: message.into(),
        }
    }
}

/// An on-chain event of interest reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEntry {
    /// Event time (Unix milliseconds).
    #[serde(rename = "ts")]
    pub ts_ms: i64,
    /// Venue (AMM) identifier.
    pub amm: String,
    pub symbol: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub slot: Option<u64>,
    /// Transaction signature, empty when unknown.
    pub tx: String,
}

impl DetectionEntry {
    pub const UNKNOWN_AMM: &'static str = "Unknown AMM";
    pub const UNKNOWN_SYMBOL: &'static str = "Unknown";
    pub const UNKNOWN_MINT: &'static str = "N/A";

    /// One-line summary used for the matching log entry.
    pub fn summary(&self) -> String {
        format!("Detection: {} on {}", self.symbol, self.amm)
    }
}
