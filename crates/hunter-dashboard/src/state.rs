//! Dashboard state.
//!
//! Read side of the console state plus the command channel into the console
//! actor. The dashboard never mutates console state directly.

use hunter_core::now_ms;
use hunter_feed::{ConsoleCommand, ConsoleSnapshot, SharedConsoleState};
use tokio::sync::mpsc;
use tracing::warn;

/// Dashboard view of the console.
#[derive(Clone)]
pub struct DashboardState {
    console: SharedConsoleState,
    commands: mpsc::Sender<ConsoleCommand>,
}

impl DashboardState {
    pub fn new(console: SharedConsoleState, commands: mpsc::Sender<ConsoleCommand>) -> Self {
        Self { console, commands }
    }

    /// Take a snapshot of the console state.
    pub fn collect_snapshot(&self) -> ConsoleSnapshot {
        self.console.read().snapshot(now_ms())
    }

    /// Change counter of the console state.
    pub fn version(&self) -> u64 {
        self.console.read().version()
    }

    /// Forward a command to the console actor.
    ///
    /// Returns `false` when the console is no longer running.
    pub async fn send_command(&self, command: ConsoleCommand) -> bool {
        match self.commands.send(command).await {
            Ok(()) => true,
            Err(e) => {
                warn!(command = ?e.0, "Console is not running, command dropped");
                false
            }
        }
    }
}
