//! User preferences persisted on the local machine.
//!
//! The preference store is the source of truth for the two dashboard flags
//! (auto-refresh and allow-mutators) and also keeps the API token. The
//! dashboard mirrors the flags into its own state; it reads the store again
//! whenever it needs the authoritative value.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub auto_refresh: bool,
    #[serde(default)]
    pub allow_mutators: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("preferences file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent key-value store for dashboard preferences.
///
/// Writes never fail from the caller's point of view; implementations that
/// can fail log the problem and keep the in-memory value.
pub trait PreferenceStore: Send + Sync {
    fn is_auto_refresh(&self) -> bool;
    fn set_auto_refresh(&self);
    fn unset_auto_refresh(&self);

    fn is_allow_mutators_enabled(&self) -> bool;
    fn set_allow_mutators_enabled(&self);
    fn unset_allow_mutators_enabled(&self);

    /// Bearer token for the supervisor API, if one was saved
    fn token(&self) -> Option<String> {
        None
    }
}

/// Preferences that live only as long as the process
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    prefs: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(prefs: Preferences) -> Self {
        Self {
            prefs: Mutex::new(prefs),
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update(&self, f: impl FnOnce(&mut Preferences)) {
        f(&mut self.prefs.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn is_auto_refresh(&self) -> bool {
        self.preferences().auto_refresh
    }

    fn set_auto_refresh(&self) {
        self.update(|p| p.auto_refresh = true);
    }

    fn unset_auto_refresh(&self) {
        self.update(|p| p.auto_refresh = false);
    }

    fn is_allow_mutators_enabled(&self) -> bool {
        self.preferences().allow_mutators
    }

    fn set_allow_mutators_enabled(&self) {
        self.update(|p| p.allow_mutators = true);
    }

    fn unset_allow_mutators_enabled(&self) {
        self.update(|p| p.allow_mutators = false);
    }

    fn token(&self) -> Option<String> {
        self.preferences().token
    }
}

/// Preferences stored as a JSON document on disk.
///
/// The file is read once when opened and rewritten after every change.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    prefs: Mutex<Preferences>,
}

impl FilePreferenceStore {
    /// Open the store at `path`. A missing file yields default preferences;
    /// it is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let prefs = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| PreferenceError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&content).map_err(|source| PreferenceError::Malformed {
                path: path.clone(),
                source,
            })?
        } else {
            Preferences::default()
        };

        tracing::debug!(
            event = "prefs.file.opened",
            path = %path.display(),
            auto_refresh = prefs.auto_refresh,
            allow_mutators = prefs.allow_mutators,
        );

        Ok(Self {
            path,
            prefs: Mutex::new(prefs),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Store a token (or clear it with `None`) and persist
    pub fn save_token(&self, token: Option<String>) -> Result<(), PreferenceError> {
        let snapshot = {
            let mut prefs = self.prefs.lock().unwrap_or_else(|e| e.into_inner());
            prefs.token = token;
            prefs.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, prefs: &Preferences) -> Result<(), PreferenceError> {
        let write_err = |source| PreferenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(prefs)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        fs::write(&self.path, content).map_err(write_err)
    }

    fn update(&self, f: impl FnOnce(&mut Preferences)) {
        let snapshot = {
            let mut prefs = self.prefs.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut prefs);
            prefs.clone()
        };

        if let Err(e) = self.persist(&snapshot) {
            tracing::warn!(
                event = "prefs.file.write_failed",
                error = %e,
                "Preference change kept in memory only"
            );
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn is_auto_refresh(&self) -> bool {
        self.preferences().auto_refresh
    }

    fn set_auto_refresh(&self) {
        self.update(|p| p.auto_refresh = true);
    }

    fn unset_auto_refresh(&self) {
        self.update(|p| p.auto_refresh = false);
    }

    fn is_allow_mutators_enabled(&self) -> bool {
        self.preferences().allow_mutators
    }

    fn set_allow_mutators_enabled(&self) {
        self.update(|p| p.allow_mutators = true);
    }

    fn unset_allow_mutators_enabled(&self) {
        self.update(|p| p.allow_mutators = false);
    }

    fn token(&self) -> Option<String> {
        self.preferences().token
    }
}
