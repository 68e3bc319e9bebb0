/// Application configuration
///
/// Stored as JSON in the user's config directory:
/// - Linux: ~/.config/trap-annotator/config.json
/// - macOS: ~/Library/Application Support/trap-annotator/config.json
/// - Windows: %APPDATA%\trap-annotator\config.json
///
/// `TRAP_ANNOTATOR_CONFIG` points at a different file. Every section has
/// defaults, so a partial file is fine and a missing one means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::state::form::Vocabulary;
use crate::state::records::RecordSchema;
use crate::sync::{Backend, SyncPolicy};

pub const CONFIG_ENV_VAR: &str = "TRAP_ANNOTATOR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the remote tables live and what they are called
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    pub backend: Backend,
    /// Table the annotations are synced into
    pub annotations_table: String,
    /// Read-only reviewer roster
    pub assignments_table: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            annotations_table: "Bird monitoring data".to_string(),
            assignments_table: "Seabird Camera Assignments".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub schema: RecordSchema,
    pub sync: SyncPolicy,
    pub vocabulary: Vocabulary,
}

impl AppConfig {
    /// Default location, honoring the environment override
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("trap-annotator").join("config.json"))
    }

    /// Load from the default location. Problems are logged and defaults used.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("⚠️  No config directory on this platform, using defaults");
            return Self::default();
        };

        Self::load_or_init(&path)
    }

    /// Load `path`. A missing file is created with the defaults so there is
    /// something to edit; a broken one is left alone.
    fn load_or_init(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(Some(config)) => {
                info!("⚙️  Config loaded from {}", path.display());
                config
            }
            Ok(None) => {
                let config = Self::default();
                match config.save_to(path) {
                    Ok(()) => info!("📝 Wrote default config to {}", path.display()),
                    Err(err) => warn!("⚠️  Could not write default config: {}", err),
                }
                config
            }
            Err(err) => {
                warn!("⚠️  {}; using defaults", err);
                Self::default()
            }
        }
    }

    /// `Ok(None)` when the file does not exist
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(io_error)
    }
}
