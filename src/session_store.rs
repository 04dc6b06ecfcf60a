//! Tab-scoped session persistence
//!
//! The wizard keeps the home university and the backend session id across
//! restarts of the same "tab". Each tab is one JSON file under the data
//! directory; other tabs never see it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

const SESSIONS_DIR_NAME: &str = "sessions";

/// What survives a restart of the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub home_university: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl PersistedSession {
    pub fn is_empty(&self) -> bool {
        self.home_university.is_none() && self.session_id.is_none()
    }
}

pub trait SessionStore: Send + Sync {
    /// Missing or unreadable data loads as empty.
    fn load(&self) -> PersistedSession;
    fn save(&self, session: &PersistedSession) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store, used for `--ephemeral` runs and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<PersistedSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(session: PersistedSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> PersistedSession {
        self.inner.lock().clone()
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        *self.inner.lock() = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.inner.lock() = PersistedSession::default();
        Ok(())
    }
}

/// One JSON file per tab: `<data_dir>/sessions/<tab>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: &Path, tab: &str) -> Self {
        Self {
            path: data_dir
                .join(SESSIONS_DIR_NAME)
                .join(format!("{}.json", sanitize_tab(tab))),
        }
    }

    /// A fresh tab with a random id.
    pub fn new_tab(data_dir: &Path) -> (Self, String) {
        let tab = uuid::Uuid::new_v4().to_string();
        (Self::new(data_dir, &tab), tab)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> PersistedSession {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return PersistedSession::default()
            }
            Err(e) => {
                warn!("Failed to read session {}: {}", self.path.display(), e);
                return PersistedSession::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring corrupt session {}: {}", self.path.display(), e);
                PersistedSession::default()
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut session = session.clone();
        session.saved_at = Some(Utc::now());
        let contents = serde_json::to_string_pretty(&session)?;
        std::fs::write(&self.path, contents)?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Tab ids end up in file names.
fn sanitize_tab(tab: &str) -> String {
    let cleaned: String = tab
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersistedSession {
        PersistedSession {
            home_university: Some("Politecnico di Torino".to_string()),
            session_id: Some("6f1d2c9e".to_string()),
            saved_at: None,
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert!(store.load().is_empty());
        store.save(&sample()).unwrap();
        assert_eq!(store.load(), sample());
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path(), "tab-1");
        store.save(&sample()).unwrap();

        let reopened = FileSessionStore::new(dir.path(), "tab-1");
        let loaded = reopened.load();
        assert_eq!(loaded.home_university, sample().home_university);
        assert_eq!(loaded.session_id, sample().session_id);
        assert!(loaded.saved_at.is_some());
    }

    #[test]
    fn test_tabs_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        FileSessionStore::new(dir.path(), "a").save(&sample()).unwrap();
        assert!(FileSessionStore::new(dir.path(), "b").load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path(), "tab");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path(), "never-saved");
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_sanitize_tab() {
        assert_eq!(sanitize_tab("../../etc"), "etc");
        assert_eq!(sanitize_tab("///"), "default");
        let (store, tab) = FileSessionStore::new_tab(Path::new("/tmp"));
        assert!(store.path().ends_with(format!("{}.json", tab)));
    }
}
