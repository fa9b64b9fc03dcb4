//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sessionlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sessionlens/` (~/.config/sessionlens/)
//! - State/Logs: `$XDG_STATE_HOME/sessionlens/` (~/.local/state/sessionlens/)

use crate::analytics::Granularity;
use crate::db::LoadOptions;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Input file and store location
    #[serde(default)]
    pub data: DataConfig,

    /// Analytics defaults
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where events come from and where they are stored
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Default delimited file to load
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// SQLite location: `":memory:"` or a file path
    #[serde(default = "default_database")]
    pub database: String,

    /// Field delimiter of the input file (single ASCII character)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            database: default_database(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("user_events.csv")
}

fn default_database() -> String {
    ":memory:".to_string()
}

fn default_delimiter() -> char {
    ','
}

impl DataConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(Error::Config(format!(
                "data.delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        if self.database.trim().is_empty() {
            return Err(Error::Config("data.database must not be empty".to_string()));
        }
        Ok(())
    }

    /// Reader options derived from this config.
    pub fn load_options(&self) -> Result<LoadOptions> {
        self.validate()?;
        Ok(LoadOptions {
            delimiter: self.delimiter as u8,
        })
    }
}

/// Analytics defaults
#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsConfig {
    /// Bucket width used when none is requested
    #[serde(default)]
    pub default_granularity: Granularity,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.data.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sessionlens/config.toml` (~/.config/sessionlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sessionlens").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sessionlens/` (~/.local/state/sessionlens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sessionlens")
    }

    /// Returns the path of today's log file
    ///
    /// Logs rotate daily, so this is
    /// `$XDG_STATE_HOME/sessionlens/sessionlens.YYYY-MM-DD.log` for the current UTC date.
    pub fn log_path() -> PathBuf {
        crate::logging::current_log_file(&Self::state_dir())
    }
}
