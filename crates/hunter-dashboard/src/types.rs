//! Dashboard API types.

use hunter_feed::ConsoleSnapshot;
use serde::{Deserialize, Serialize};

/// WebSocket message types (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(ConsoleSnapshot),
    /// Sent whenever the console state changed.
    Update(ConsoleSnapshot),
}

/// Body of `POST /api/viewer-key`. Not `Debug`: it carries the raw key.
#[derive(Deserialize)]
pub struct SubmitKeyRequest {
    pub key: String,
}

/// Body returned for accepted commands.
#[derive(Debug, Clone, Serialize)]
pub struct CommandAccepted {
    pub status: &'static str,
}

impl CommandAccepted {
    pub const fn new() -> Self {
        Self { status: "accepted" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunter_feed::ConsoleState;

    #[test]
    fn test_message_tagging() {
        let snapshot = ConsoleState::new().snapshot(42);
        let json = serde_json::to_value(DashboardMessage::Update(snapshot)).unwrap();
        assert_eq!(json["type"], "update");
        assert_eq!(json["connectionState"], "idle");
        assert_eq!(json["timestamp"], 42);
    }
}
