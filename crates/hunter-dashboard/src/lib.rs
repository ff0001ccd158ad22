//! hunter-dashboard - local rendering layer for the Hunter live console.
//!
//! Serves the console state to a browser and forwards the human's credential
//! actions back to the console actor:
//!
//! - REST API for the current snapshot and for submitting/clearing the key
//! - WebSocket pushing a snapshot on connect and an update on every change
//! - Static HTML console UI
//! - Prometheus metrics
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     hunter-console process                   │
//! │                                                              │
//! │  ┌───────────────┐   ConsoleCommand    ┌──────────────────┐  │
//! │  │ Console actor │ ◄────────────────── │  DashboardState  │  │
//! │  │ (writes state)│                     │  (reads state)   │  │
//! │  └───────┬───────┘                     └────────┬─────────┘  │
//! │          │ Arc<RwLock<ConsoleState>>            │            │
//! │          └──────────────────────────────────────┘            │
//! │                                                 │            │
//! │  ┌──────────────────────────────────────────────┴─────────┐  │
//! │  │        axum HTTP Server (127.0.0.1:8080)               │  │
//! │  │  GET    /                → Static HTML/JS              │  │
//! │  │  GET    /api/snapshot    → JSON snapshot               │  │
//! │  │  POST   /api/viewer-key  → submit key                  │  │
//! │  │  DELETE /api/viewer-key  → clear key                   │  │
//! │  │  GET    /ws              → WebSocket updates           │  │
//! │  │  GET    /metrics         → Prometheus text             │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, AppState};
pub use state::DashboardState;
pub use types::{DashboardMessage, SubmitKeyRequest};
