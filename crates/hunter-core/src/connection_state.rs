//! Stream connection state machine.

use serde::{Deserialize, Serialize};

/// Connection state shown by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No credential available.
    #[default]
    Idle,
    /// Credential available, handshake in progress.
    Connecting,
    /// Handshake succeeded, frames are flowing.
    Connected,
    /// Closed by the remote for any non-auth reason, or a transport fault.
    Error,
    /// Closed by the remote with an authentication-rejection code.
    Unauthorized,
}

/// Event that may move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTrigger {
    /// A credential was submitted (or restored) and a connection is being opened.
    CredentialSubmitted,
    /// The stream handshake completed.
    HandshakeSucceeded,
    /// The remote closed with an authentication-rejection signal.
    RejectedByRemote,
    /// The remote closed for another reason, or opening/transport failed.
    Failed,
    /// The credential was explicitly cleared.
    CredentialCleared,
}

impl ConnectionState {
    /// All states, in display order.
    pub const ALL: [ConnectionState; 5] = [
        Self::Idle,
        Self::Connecting,
        Self::Connected,
        Self::Error,
        Self::Unauthorized,
    ];

    /// Next state for `trigger`, or `None` if the transition is not allowed.
    pub fn next(self, trigger: ConnectionTrigger) -> Option<Self> {
        use ConnectionState::*;
        use ConnectionTrigger::*;

        match (self, trigger) {
            (_, CredentialCleared) => Some(Idle),
            // Resubmitting while connecting/connected tears the old stream down first.
            (_, CredentialSubmitted) => Some(Connecting),
            (Connecting, HandshakeSucceeded) => Some(Connected),
            (Connecting | Connected, RejectedByRemote) => Some(Unauthorized),
            (Connecting | Connected, Failed) => Some(Error),
            _ => None,
        }
    }

    /// Badge label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Error => "Disconnected",
            Self::Unauthorized => "Unauthorized",
        }
    }

    /// Lowercase machine name (metrics labels, JSON).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
