//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/evoforge/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/evoforge/` (~/.config/evoforge/)
//! - Data: `$XDG_DATA_HOME/evoforge/` (~/.local/share/evoforge/)
//! - State/Logs: `$XDG_STATE_HOME/evoforge/` (~/.local/state/evoforge/)

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

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
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
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Incremental fixer limits
    #[serde(default)]
    pub fixer: FixerConfig,

    /// Document location overrides
    #[serde(default)]
    pub storage: StorageConfig,
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

/// Incremental fixer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FixerConfig {
    /// Upper bound on mechanical edits applied in one repair cycle
    #[serde(default = "default_max_changes_per_iteration")]
    pub max_changes_per_iteration: usize,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            max_changes_per_iteration: default_max_changes_per_iteration(),
        }
    }
}

impl FixerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_changes_per_iteration == 0 {
            return Err(Error::Config(
                "fixer.max_changes_per_iteration must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_changes_per_iteration() -> usize {
    5
}

/// Where session and pattern documents live
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Directory holding `evolution_<session>.json` documents
    pub sessions_dir: Option<PathBuf>,
    /// Pattern library document
    pub patterns_path: Option<PathBuf>,
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

        config.fixer.validate()?;
        Ok(config)
    }

    /// Directory for session documents, honoring `storage.sessions_dir`
    pub fn sessions_dir(&self) -> PathBuf {
        self.storage
            .sessions_dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("sessions"))
    }

    /// Pattern library document, honoring `storage.patterns_path`
    pub fn patterns_path(&self) -> PathBuf {
        self.storage
            .patterns_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("success_patterns.json"))
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/evoforge/config.toml` (~/.config/evoforge/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("evoforge").join("config.toml")
    }

    /// Returns the data directory path (for session and pattern documents)
    ///
    /// `$XDG_DATA_HOME/evoforge/` (~/.local/share/evoforge/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("evoforge")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/evoforge/` (~/.local/state/evoforge/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("evoforge")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/evoforge/evoforge.log` (~/.local/state/evoforge/evoforge.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("evoforge.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
