//! Viewer credential storage for the Hunter live console.
//!
//! The viewer key is the only durable state. It is stored as one named entry
//! (`hunterViewerKey`) so it survives restarts, and removed on explicit clear.

pub mod error;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, VIEWER_KEY_ENTRY};
