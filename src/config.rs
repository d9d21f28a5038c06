//! Configuration for canopy.
//!
//! Read from `~/.config/canopy/config.toml`. When the file does not exist a
//! default one with comments is written. Missing fields take their defaults.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::daemon::DaemonConfig;
use crate::sync::DEFAULT_WORKERS;

const DEFAULT_OWNER: &str = "default";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner used when `--owner` is not given.
    pub owner: Option<String>,
    /// Database file. Defaults to `canopy.db` under the user data directory.
    pub database: Option<PathBuf>,
    pub fetch: FetchConfig,
    pub daemon: DaemonSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Feed syncs allowed to run at once.
    pub workers: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            workers: DEFAULT_WORKERS,
            user_agent: concat!("canopy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// "30m", "6h", "1d", "60s" or plain seconds.
    pub interval: String,
    pub update_on_start: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            interval: "1d".to_string(),
            update_on_start: true,
            log_file: None,
        }
    }
}

impl DaemonSettings {
    pub fn to_daemon_config(&self) -> Result<DaemonConfig, ConfigError> {
        let update_interval_secs =
            DaemonConfig::parse_interval(&self.interval).map_err(ConfigError::Invalid)?;
        if update_interval_secs == 0 {
            return Err(ConfigError::Invalid("Interval must be positive".into()));
        }
        Ok(DaemonConfig {
            update_interval_secs,
            update_on_start: self.update_on_start,
            log_file: self.log_file.clone(),
        })
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, creating a commented default there if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// `~/.config/canopy/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("canopy").join("config.toml"))
    }

    /// The owner to act as: an explicit choice, then `owner` from the file,
    /// then `$USER`.
    pub fn resolve_owner(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.owner.clone())
            .or_else(|| std::env::var("USER").ok())
            .filter(|owner| !owner.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OWNER.to_string())
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# canopy configuration

# Owner whose tree the command line works on. Falls back to $USER.
# owner = "alice"

# SQLite database file. Defaults to the user data directory.
# database = "/path/to/canopy.db"

[fetch]
# HTTP timeout per document, in seconds
timeout_secs = 10

# Maximum number of feeds synchronized at the same time
workers = 10

# user_agent = "canopy/0.1.0"

[daemon]
# How often to update every tree: "30m", "6h", "1d", "60s" or seconds
interval = "1d"

# Run an update as soon as the daemon starts
update_on_start = true

# Append daemon logs to this file instead of stdout
# log_file = "/tmp/canopy.log"
"##
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
