//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `menagerie.yaml` at the process
//! working directory. This module defines strongly-typed structs that
//! mirror the YAML structure and provides a loader that reads the file.
//! Every section and field has a default matching the constants the
//! simulation was designed around, so a missing file or a partial file
//! is never an error.

use std::path::Path;

use menagerie_types::WorldBounds;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration for the pet world engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// World geometry and cosmetics.
    #[serde(default)]
    pub world: WorldConfig,

    /// Simulation loop intervals.
    #[serde(default)]
    pub simulation: TimingConfig,

    /// Persistence paths and policy knobs.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Gateway server bind address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for storage paths:
    /// - `MENAGERIE_SNAPSHOT_PATH` overrides `persistence.snapshot_path`
    /// - `MENAGERIE_DB_PATH` overrides `persistence.user_db_path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.persistence.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.persistence.apply_env_overrides();
        Ok(config)
    }
}

/// World geometry and the cosmetic marker set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// World width in field units.
    #[serde(default = "default_width")]
    pub width: f64,

    /// World height in field units.
    #[serde(default = "default_height")]
    pub height: f64,

    /// Inset from the world edges inside which new pets spawn.
    #[serde(default = "default_spawn_inset")]
    pub spawn_inset: f64,

    /// Cosmetic markers assigned to newborn pets.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

impl WorldConfig {
    /// The world rectangle as typed bounds.
    pub const fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.width, self.height)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            spawn_inset: default_spawn_inset(),
            markers: default_markers(),
        }
    }
}

/// Simulation loop intervals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Stat-decay tick interval in milliseconds.
    #[serde(default = "default_stat_tick_ms")]
    pub stat_tick_ms: u64,

    /// Movement tick interval in milliseconds.
    #[serde(default = "default_movement_tick_ms")]
    pub movement_tick_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stat_tick_ms: default_stat_tick_ms(),
            movement_tick_ms: default_movement_tick_ms(),
        }
    }
}

/// Persistence paths and policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON snapshot document.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Path of the SQLite user database.
    #[serde(default = "default_user_db_path")]
    pub user_db_path: String,

    /// Debounce delay before a scheduled save fires, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Unconditional backup save interval, in seconds.
    #[serde(default = "default_backup_interval_secs")]
    pub backup_interval_secs: u64,
}

impl PersistenceConfig {
    /// Apply environment-variable overrides for storage paths.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MENAGERIE_SNAPSHOT_PATH") {
            self.snapshot_path = path;
        }
        if let Ok(path) = std::env::var("MENAGERIE_DB_PATH") {
            self.user_db_path = path;
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            user_db_path: default_user_db_path(),
            debounce_ms: default_debounce_ms(),
            backup_interval_secs: default_backup_interval_secs(),
        }
    }
}

/// Gateway server bind address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    600.0
}

fn default_spawn_inset() -> f64 {
    50.0
}

fn default_markers() -> Vec<String> {
    ["🐱", "🐶", "🐰", "🐸", "🐧", "🐨", "🦊", "🐼"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_stat_tick_ms() -> u64 {
    1000
}

const fn default_movement_tick_ms() -> u64 {
    100
}

fn default_snapshot_path() -> String {
    String::from("world_snapshot.json")
}

fn default_user_db_path() -> String {
    String::from("menagerie_users.sqlite")
}

const fn default_debounce_ms() -> u64 {
    2000
}

const fn default_backup_interval_secs() -> u64 {
    30
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_log_filter() -> String {
    String::from("info")
}
