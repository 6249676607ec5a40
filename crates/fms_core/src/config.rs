//! Configuration for the FMS export tooling.
//!
//! A single [`FmsConfig`] is loaded once at startup and passed by reference
//! into the API client and the exporter. Nothing downstream reads base URLs
//! or output locations from process-wide state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Production API root of the FMS backend.
pub const DEFAULT_BASE_URL: &str = "https://fms-qkmw.onrender.com/fms/api/v0";

/// Errors raised while locating, reading or writing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL that resource names are appended to.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Export defaults applied when a request leaves them unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Where artifacts are written. `None` means `~/.fms/exports`.
    pub output_dir: Option<PathBuf>,
    /// chrono format string used for `date` columns.
    pub date_format: String,
    /// Fail on unresolved paths and non-numeric amounts instead of blanking them.
    pub strict: bool,
    /// Worksheet name used for Excel exports.
    pub sheet_name: String,
    /// Column width used when a descriptor carries none.
    pub default_column_width: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            date_format: "%-m/%-d/%Y".into(),
            strict: false,
            sheet_name: "Data".into(),
            default_column_width: 15.0,
        }
    }
}

/// Application configuration stored at `~/.fms/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmsConfig {
    pub api: ApiConfig,
    pub export: ExportConfig,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for FmsConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            export: ExportConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl FmsConfig {
    /// Returns the base config directory: `~/.fms/`
    pub fn base_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".fms"))
    }

    /// Returns the config file path: `~/.fms/config.json`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.fms/logs/`
    pub fn logs_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// The directory exports land in, honouring `export.output_dir`.
    pub fn output_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.export.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::base_dir()?.join("exports")),
        }
    }

    /// Load config from a specific file path. Missing or malformed files are errors.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from a JSON file, or return defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Self {
        let (config, fallback) = Self::load_with_fallback(path);
        if let Some(e) = fallback {
            warn!("Unusable config file, using defaults: {e}");
        }
        config
    }

    /// Like [`load_or_default`](Self::load_or_default), but returns the error
    /// that forced the fallback instead of logging it. Callers that load
    /// config before logging is up report it themselves.
    pub fn load_with_fallback(path: &Path) -> (Self, Option<ConfigError>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load_from_path(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Save the config as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
