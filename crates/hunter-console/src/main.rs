//! Hunter live streaming console - Entry Point
//!
//! Connects to the Hunter detection stream with a viewer key and serves the
//! console on a local dashboard.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Hunter live streaming console
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "HUNTER_CONFIG")]
    config: Option<String>,

    /// Stream URL, overriding the config file
    #[arg(long, env = "HUNTER_WS")]
    ws_url: Option<String>,

    /// Submit this viewer key at start-up instead of the stored one
    #[arg(long, env = "HUNTER_VIEWER_KEY", hide_env_values = true)]
    viewer_key: Option<String>,

    /// Keep the viewer key in memory only
    #[arg(long)]
    no_persist: bool,

    /// Do not start the dashboard server
    #[arg(long)]
    no_dashboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = hunter_console::AppConfig::load(args.config.as_deref())?;
    if let Some(url) = args.ws_url {
        config.ws_url = url;
    }
    if args.no_persist {
        config.credential.persist = false;
    }
    if args.no_dashboard {
        config.dashboard.enabled = false;
    }

    hunter_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting Hunter console v{}", env!("CARGO_PKG_VERSION"));
    info!(
        ws_url = %config.ws_url,
        persist = config.credential.persist,
        dashboard = config.dashboard.enabled,
        "Configuration loaded"
    );
    if config.dashboard.enabled {
        info!(
            "Dashboard at http://{}:{}",
            config.dashboard.bind, config.dashboard.port
        );
    }

    let app = hunter_console::Application::new(config)?;
    app.run(args.viewer_key).await?;

    Ok(())
}
