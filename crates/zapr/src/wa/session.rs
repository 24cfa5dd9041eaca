//! Session artifact store.
//!
//! At most one opaque credential file exists at a time. It is created as a
//! side effect of the external client's authentication flow; the store only
//! observes and deletes it. Deleting forces a fresh QR pairing on the next
//! connect attempt.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::error::{WaError, WaResult};

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the session artifact.
    ///
    /// A missing artifact is treated as already satisfied, so concurrent or
    /// repeated disconnects never fail past the first removal.
    pub fn delete(&self) -> WaResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed session artifact {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Session artifact {} already absent", self.path.display());
                Ok(())
            }
            Err(e) => Err(WaError::Teardown(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exists_reflects_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(&path);

        assert!(!store.exists());
        fs::write(&path, "{}").unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_delete_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();

        let store = SessionStore::new(&path);
        store.delete().unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();

        let store = SessionStore::new(&path);
        store.delete().unwrap();
        // Second delete sees a missing artifact and still succeeds.
        store.delete().unwrap();
    }
}
