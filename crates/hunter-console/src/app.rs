//! Main application orchestration.
//!
//! Coordinates all components:
//! - Credential store selection (file or memory)
//! - Console actor (stream connection and state)
//! - Dashboard server
//! - Ctrl-C shutdown

use hunter_dashboard::DashboardState;
use hunter_feed::{ConsoleCommand, SharedConsoleState};
use hunter_persistence::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::console::Console;
use crate::error::AppResult;

/// Pending human commands.
const COMMAND_BUFFER: usize = 32;

/// Main application.
pub struct Application {
    config: AppConfig,
    console: Console,
    command_tx: mpsc::Sender<ConsoleCommand>,
    command_rx: mpsc::Receiver<ConsoleCommand>,
    shutdown: CancellationToken,
}

impl Application {
    /// Create a new application. Fails on an unusable configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let store: Box<dyn CredentialStore> = if config.credential.persist {
            info!(path = %config.credential.path.display(), "Using file credential store");
            Box::new(FileCredentialStore::new(config.credential.path.clone()))
        } else {
            info!("Using in-memory credential store");
            Box::new(MemoryCredentialStore::new())
        };

        let console = Console::new(
            config.connection_config(),
            store,
            config.websocket.event_buffer,
        );
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        Ok(Self {
            config,
            console,
            command_tx,
            command_rx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Read side of the console state.
    pub fn console_state(&self) -> SharedConsoleState {
        self.console.state()
    }

    /// Sender for console commands.
    pub fn commands(&self) -> mpsc::Sender<ConsoleCommand> {
        self.command_tx.clone()
    }

    /// Token that stops the application when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until Ctrl-C or the shutdown token is cancelled.
    ///
    /// `initial_key` is submitted as if typed by the viewer. Without it the
    /// stored key, if any, is used.
    pub async fn run(self, initial_key: Option<String>) -> AppResult<()> {
        let Self {
            config,
            mut console,
            command_tx,
            command_rx,
            shutdown,
        } = self;

        match initial_key {
            Some(raw) => console.submit_key(&raw),
            None => console.restore(),
        }

        let dashboard_handle = if config.dashboard.enabled {
            let dashboard_state = DashboardState::new(console.state(), command_tx.clone());
            let dashboard_config = config.dashboard.clone();
            let token = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(e) =
                    hunter_dashboard::run_server(dashboard_state, dashboard_config, token).await
                {
                    error!(error = %e, "Dashboard server failed");
                }
            }))
        } else {
            info!("Dashboard disabled");
            None
        };

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Shutdown signal received"),
                        Err(e) => {
                            error!(error = %e, "Failed to listen for Ctrl-C");
                            return;
                        }
                    }
                    signal_token.cancel();
                }
                () = signal_token.cancelled() => {}
            }
        });

        // Keeps the command channel open while the dashboard is disabled.
        let _command_tx = command_tx;
        console.run(command_rx, shutdown.clone()).await;

        shutdown.cancel();
        if let Some(handle) = dashboard_handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Dashboard task panicked");
            }
        }

        info!("Shutting down");
        Ok(())
    }
}
