use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Which backend previews and rewrites documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    /// In-process lopdf engine.
    #[default]
    Native,
    /// External per-operation scripts run through `interpreter`.
    Script,
}

impl fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Script => "script",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: EngineBackend,
    pub interpreter: String,
    /// Directory holding the operation scripts; required by the script backend.
    pub script_dir: Option<PathBuf>,
    /// Where preview images go. Defaults to `<data dir>/previews`.
    pub preview_dir: Option<PathBuf>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: EngineBackend::Native,
            interpreter: "python".to_owned(),
            script_dir: None,
            preview_dir: None,
            thumbnail_width: 160,
            thumbnail_height: 220,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    settings: Settings,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "ForgePDF", "ForgePDF").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn preview_dir(&self, settings: &Settings) -> PathBuf {
        settings.preview_dir.clone().unwrap_or_else(|| self.root.join("previews"))
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }

        let bytes = fs::read(&path)?;
        let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != SETTINGS_SCHEMA_VERSION {
            log::warn!(
                "settings schema version {} differs from {SETTINGS_SCHEMA_VERSION}; unknown fields are ignored",
                envelope.version
            );
        }

        Ok(envelope.settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope = SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: settings.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.settings_path(), bytes)?;
        log::debug!("saved settings to {}", self.settings_path().display());
        Ok(())
    }
}
