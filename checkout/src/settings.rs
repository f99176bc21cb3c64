//! Locally persisted app settings.
//!
//! [`Settings`] is initialised once from its store (persisted value or the
//! default) and writes through to the store on every mutation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use payflow_common::chain::Network;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no config directory on this platform")]
    NoConfigDir,

    #[error("settings io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub auto_connect: bool,
    pub dark_mode: bool,
    /// Network to preselect when the wallet has none.
    pub preferred_network: Option<Network>,
    /// Flow uuids whose "top up" banner the user dismissed.
    pub dismissed_top_ups: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            auto_connect: true,
            dark_mode: false,
            preferred_network: None,
            dismissed_top_ups: Vec::new(),
        }
    }
}

/// Where settings are persisted.
pub trait SettingsStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<AppSettings>, SettingsError>;

    fn save(&self, settings: &AppSettings) -> Result<(), SettingsError>;
}

/// JSON file, by default `<config dir>/payflow/settings.json`.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(dir.join("payflow").join("settings.json"))
    }

    pub fn at_default_path() -> Result<Self, SettingsError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<AppSettings>, SettingsError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn save(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let data = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, data).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// In-memory store; clones share contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<AppSettings>>>,
}

impl MemoryStore {
    pub fn saved(&self) -> Option<AppSettings> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<AppSettings>, SettingsError> {
        Ok(self.saved())
    }

    fn save(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        Ok(())
    }
}

/// Current settings plus the store they are written through to.
pub struct Settings<S> {
    store: S,
    current: RwLock<AppSettings>,
}

impl<S: SettingsStore> Settings<S> {
    /// Read the persisted settings, or start from defaults.
    pub fn init(store: S) -> Result<Self, SettingsError> {
        let current = match store.load()? {
            Some(settings) => settings,
            None => {
                tracing::debug!("no persisted settings, using defaults");
                AppSettings::default()
            }
        };
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    pub fn get(&self) -> AppSettings {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply `change` and persist. The in-memory value only changes if the
    /// write succeeds.
    pub fn update(
        &self,
        change: impl FnOnce(&mut AppSettings),
    ) -> Result<AppSettings, SettingsError> {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut next = current.clone();
        change(&mut next);
        if next != *current {
            self.store.save(&next)?;
            *current = next.clone();
        }
        Ok(next)
    }

    pub fn set_preferred_network(
        &self,
        network: Option<Network>,
    ) -> Result<AppSettings, SettingsError> {
        self.update(|s| s.preferred_network = network)
    }

    pub fn dismiss_top_up(&self, flow_uuid: &str) -> Result<AppSettings, SettingsError> {
        self.update(|s| {
            if !s.dismissed_top_ups.iter().any(|f| f == flow_uuid) {
                s.dismissed_top_ups.push(flow_uuid.to_string());
            }
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
