//! Credential stores.
//!
//! `load` never fails: anything unusable on disk is logged and treated as
//! "no credential". `save` and `clear` report I/O errors so the caller can
//! log them, but a failed save must not block connecting.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use hunter_core::ViewerKey;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;

/// Name of the persisted entry.
pub const VIEWER_KEY_ENTRY: &str = "hunterViewerKey";

/// Durable storage for the viewer key.
pub trait CredentialStore: Send {
    /// Persisted key, if any.
    fn load(&self) -> Option<ViewerKey>;

    /// Overwrite the persisted key.
    fn save(&mut self, key: &ViewerKey) -> PersistenceResult<()>;

    /// Remove the persisted key. Clearing an absent key succeeds.
    fn clear(&mut self) -> PersistenceResult<()>;
}

/// JSON-file store: `{"hunterViewerKey": "..."}`.
///
/// Writes go to a temp file in the same directory which is then persisted
/// over the target, so a crash never leaves a half-written file. A failed
/// write removes the temp file. On Unix the file is owner-only (0600).
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entry map. `Ok(None)` when the file does not exist.
    fn read_entries(&self) -> PersistenceResult<Option<BTreeMap<String, serde_json::Value>>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn write_entries(&self, entries: &BTreeMap<String, serde_json::Value>) -> PersistenceResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let encoded = serde_json::to_vec_pretty(entries)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        restrict_permissions(tmp.as_file())?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Existing entries for a read-modify-write. Unreadable files are
    /// replaced rather than blocking the write.
    fn entries_for_update(&self) -> BTreeMap<String, serde_json::Value> {
        match self.read_entries() {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Replacing unreadable credential file");
                BTreeMap::new()
            }
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<ViewerKey> {
        let entries = match self.read_entries() {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(path = %self.path.display(), "No credential file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read credential file");
                return None;
            }
        };

        let raw = entries.get(VIEWER_KEY_ENTRY)?.as_str()?;
        match ViewerKey::parse(raw) {
            Ok(key) => {
                debug!(path = %self.path.display(), key = %key, "Loaded stored viewer key");
                Some(key)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring stored viewer key");
                None
            }
        }
    }

    fn save(&mut self, key: &ViewerKey) -> PersistenceResult<()> {
        let mut entries = self.entries_for_update();
        entries.insert(
            VIEWER_KEY_ENTRY.to_string(),
            serde_json::Value::String(key.expose().to_string()),
        );
        self.write_entries(&entries)?;
        info!(path = %self.path.display(), key = %key, "Viewer key saved");
        Ok(())
    }

    fn clear(&mut self) -> PersistenceResult<()> {
        let mut entries = match self.read_entries() {
            Ok(Some(entries)) => entries,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Removing unreadable credential file");
                BTreeMap::new()
            }
        };

        entries.remove(VIEWER_KEY_ENTRY);
        if entries.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_entries(&entries)?;
        }
        info!(path = %self.path.display(), "Viewer key cleared");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// Process-lifetime store (persistence disabled).
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    key: Option<ViewerKey>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<ViewerKey> {
        self.key.clone()
    }

    fn save(&mut self, key: &ViewerKey) -> PersistenceResult<()> {
        self.key = Some(key.clone());
        Ok(())
    }

    fn clear(&mut self) -> PersistenceResult<()> {
        self.key = None;
        Ok(())
    }
}
