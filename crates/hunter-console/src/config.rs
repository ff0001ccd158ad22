//! Application configuration.

use std::path::{Path, PathBuf};

use hunter_core::ViewerKey;
use hunter_dashboard::DashboardConfig;
use hunter_telemetry::DEFAULT_FILTER;
use hunter_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Config file used when neither `--config` nor `HUNTER_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Stream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Close codes that mean "viewer key rejected".
    #[serde(default = "default_unauthorized_close_codes")]
    pub unauthorized_close_codes: Vec<u16>,
    /// Handshake HTTP statuses that mean "viewer key rejected".
    #[serde(default = "default_unauthorized_http_statuses")]
    pub unauthorized_http_statuses: Vec<u16>,
    /// Capacity of the connection event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_unauthorized_close_codes() -> Vec<u16> {
    vec![1008, 4403]
}

fn default_unauthorized_http_statuses() -> Vec<u16> {
    vec![401, 403]
}

fn default_event_buffer() -> usize {
    1024
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            unauthorized_close_codes: default_unauthorized_close_codes(),
            unauthorized_http_statuses: default_unauthorized_http_statuses(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Viewer key storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// JSON file holding the key.
    #[serde(default = "default_credential_path")]
    pub path: PathBuf,
    /// Keep the key across restarts. When false the key lives in memory only.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_credential_path() -> PathBuf {
    PathBuf::from("./data/viewer-key.json")
}

fn default_persist() -> bool {
    true
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            path: default_credential_path(),
            persist: default_persist(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base stream URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub credential: CredentialConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_ws_url() -> String {
    "wss://hunter.rosieai.dev/stream".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            websocket: WsConfig::default(),
            credential: CredentialConfig::default(),
            dashboard: DashboardConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// used if present, otherwise defaults.
    pub fn load(explicit: Option<&str>) -> AppResult<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config {path}: {e}")))
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> AppResult<()> {
        // Any valid key will do: this only checks the base URL.
        let placeholder =
            ViewerKey::parse("placeholder").map_err(|e| AppError::Config(e.to_string()))?;
        hunter_ws::build_stream_url(&self.ws_url, &placeholder).map_err(Box::new)?;

        if self.websocket.event_buffer == 0 {
            return Err(AppError::Config(
                "websocket.event_buffer must be positive".to_string(),
            ));
        }
        if self.dashboard.enabled {
            self.dashboard.socket_addr()?;
            if self.dashboard.update_interval_ms == 0 {
                return Err(AppError::Config(
                    "dashboard.update_interval_ms must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Connection manager settings.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.ws_url.clone(),
            unauthorized_close_codes: self.websocket.unauthorized_close_codes.clone(),
            unauthorized_http_statuses: self.websocket.unauthorized_http_statuses.clone(),
        }
    }
}
