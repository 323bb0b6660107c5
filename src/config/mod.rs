//! Configuration management.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::storage::FeatureBackendType;

/// Main configuration for remoteconf.
#[derive(Debug, Clone)]
pub struct RemoteConfConfig {
    /// Directory holding the feature database.
    pub data_dir: PathBuf,
    /// Explicit database file; overrides `{data_dir}/features.db`.
    pub database_path: Option<PathBuf>,
    /// Storage backend.
    pub storage_backend: FeatureBackendType,
    /// App version code used by the feature gate.
    pub app_version: i64,
    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

/// Observability settings from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, for example `info` or `remoteconf=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<String>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus exporter.
    pub enabled: Option<bool>,
    /// Exporter listen port.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database file.
    pub database_path: Option<String>,
    /// Storage backend name: `sqlite` or `memory`.
    pub storage: Option<String>,
    /// App version code.
    pub app_version: Option<i64>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

impl Default for RemoteConfConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".remoteconf"),
            database_path: None,
            storage_backend: FeatureBackendType::default(),
            app_version: 0,
            observability: ObservabilitySettings::default(),
        }
    }
}

impl RemoteConfConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let config = Self::parse_toml(&contents)?;
        Ok(config.with_env_overrides())
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`].
    pub fn parse_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir first
    /// (`~/.config/remoteconf/config.toml` on Linux), and falls back to
    /// defaults with the data directory under the platform data dir.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(dirs) = directories::ProjectDirs::from("", "", "remoteconf") else {
            return Self::default().with_env_overrides();
        };

        let config_file = dirs.config_dir().join("config.toml");
        if config_file.exists()
            && let Ok(config) = Self::load_from_file(&config_file)
        {
            return config;
        }

        Self::default()
            .with_data_dir(dirs.data_dir())
            .with_env_overrides()
    }

    /// Applies `REMOTECONF_*` environment overrides.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `REMOTECONF_DATA_DIR` | `data_dir` |
    /// | `REMOTECONF_DB_PATH` | `database_path` |
    /// | `REMOTECONF_STORAGE` | `storage_backend` |
    /// | `REMOTECONF_APP_VERSION` | `app_version` |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = non_empty_env("REMOTECONF_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty_env("REMOTECONF_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(storage) = non_empty_env("REMOTECONF_STORAGE") {
            self.storage_backend = FeatureBackendType::parse(&storage);
        }
        if let Some(version) = non_empty_env("REMOTECONF_APP_VERSION") {
            match version.trim().parse() {
                Ok(v) => self.app_version = v,
                Err(_) => tracing::warn!(value = %version, "ignoring invalid REMOTECONF_APP_VERSION"),
            }
        }
        self
    }

    /// Converts a `ConfigFile` to `RemoteConfConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.database_path = file.database_path.map(PathBuf::from);
        if let Some(storage) = file.storage {
            config.storage_backend = FeatureBackendType::parse(&storage);
        }
        if let Some(app_version) = file.app_version {
            config.app_version = app_version;
        }
        config.observability = ObservabilitySettings {
            logging: file.logging,
            metrics: file.metrics,
        };

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets an explicit database path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the app version code.
    #[must_use]
    pub const fn with_app_version(mut self, version: i64) -> Self {
        self.app_version = version;
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
