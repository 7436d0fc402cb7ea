//! Configuration management for nodemeter.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable and CLI overrides (applied by the CLI layer)
//! - Validation and defaults

use crate::core::{NodemeterError, Result, Role};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for nodemeter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,
    /// Collection cadence, used to reject jittered counter samples
    pub collection: CollectionConfig,
    /// Report metadata
    pub report: ReportConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which metric store backend to open
    pub backend: StorageBackendKind,
    /// Database file for the sqlite backend
    pub db_path: PathBuf,
}

/// Collection cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Interval between companion samples
    #[serde(with = "humantime_serde")]
    pub companion_step: Duration,
    /// Interval between repeater samples
    #[serde(with = "humantime_serde")]
    pub repeater_step: Duration,
    /// Fraction of the step below which a counter sample counts as jitter
    pub counter_interval_ratio: f64,
}

/// Report metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Human readable location name
    pub location_name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Elevation in meters
    pub elevation_m: f64,
    /// Display name of the companion node
    pub companion_display_name: String,
    /// Display name of the repeater node
    pub repeater_display_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level when neither `--debug` nor `NODEMETER_LOG_LEVEL` is given
    pub level: LogLevel,
}

/// Metric store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Volatile in-process store
    Memory,
    /// SQLite database file
    Sqlite,
}

/// Log levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything
    Trace,
    /// Diagnostics
    Debug,
    /// Progress messages
    Info,
    /// Recoverable problems only
    Warn,
    /// Failures only
    Error,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig::default(),
            collection: CollectionConfig::default(),
            report: ReportConfig::default(),
            logging: LoggingConfig::default(),
            debug: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackendKind::Sqlite,
            db_path: PathBuf::from("./data/state/metrics.db"),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            companion_step: Duration::from_secs(60),
            repeater_step: Duration::from_secs(900),
            counter_interval_ratio: 0.9,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            location_name: "Unknown location".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            elevation_m: 0.0,
            companion_display_name: "Companion Node".to_string(),
            repeater_display_name: "Repeater Node".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: LogLevel::Warn }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackendKind::Sqlite
            && self.storage.db_path.as_os_str().is_empty()
        {
            return Err(NodemeterError::config("db_path must be set for the sqlite backend"));
        }

        if self.collection.companion_step.is_zero() || self.collection.repeater_step.is_zero() {
            return Err(NodemeterError::config("collection steps must be greater than 0"));
        }

        let ratio = self.collection.counter_interval_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(NodemeterError::config(format!(
                "counter_interval_ratio must be between 0.0 and 1.0, got {}",
                ratio
            )));
        }

        if !(-90.0..=90.0).contains(&self.report.latitude) {
            return Err(NodemeterError::config(format!(
                "latitude must be between -90 and 90, got {}",
                self.report.latitude
            )));
        }

        if !(-180.0..=180.0).contains(&self.report.longitude) {
            return Err(NodemeterError::config(format!(
                "longitude must be between -180 and 180, got {}",
                self.report.longitude
            )));
        }

        Ok(())
    }

    /// Collection interval for a role
    pub fn step_for(&self, role: Role) -> Duration {
        match role {
            Role::Companion => self.collection.companion_step,
            Role::Repeater => self.collection.repeater_step,
        }
    }

    /// Minimum spacing between counter samples for a role, in seconds.
    ///
    /// Never below one second.
    pub fn min_counter_interval(&self, role: Role) -> f64 {
        (self.step_for(role).as_secs_f64() * self.collection.counter_interval_ratio).max(1.0)
    }

    /// Display name used in report headers
    pub fn display_name(&self, role: Role) -> &str {
        match role {
            Role::Companion => &self.report.companion_display_name,
            Role::Repeater => &self.report.repeater_display_name,
        }
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| NodemeterError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Select the storage backend
    pub fn backend(mut self, backend: StorageBackendKind) -> Self {
        self.config.storage.backend = backend;
        self
    }

    /// Set database path
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.storage.db_path = path;
        self
    }

    /// Set companion collection step
    pub fn companion_step(mut self, step: Duration) -> Self {
        self.config.collection.companion_step = step;
        self
    }

    /// Set repeater collection step
    pub fn repeater_step(mut self, step: Duration) -> Self {
        self.config.collection.repeater_step = step;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_interval_ratio() {
        let mut config = Config::default();
        config.collection.counter_interval_ratio = 1.5;
        assert!(config.validate().is_err());

        config.collection.counter_interval_ratio = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_step_rejected() {
        let result = ConfigBuilder::new().repeater_step(Duration::ZERO).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_min_counter_interval() {
        let config = Config::default();
        assert_eq!(config.min_counter_interval(Role::Companion), 54.0);
        assert_eq!(config.min_counter_interval(Role::Repeater), 810.0);

        let config = ConfigBuilder::new()
            .companion_step(Duration::from_millis(500))
            .build()
            .unwrap();
        assert_eq!(config.min_counter_interval(Role::Companion), 1.0);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .backend(StorageBackendKind::Memory)
            .db_path(PathBuf::from("/tmp/metrics.db"))
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/metrics.db"));
        assert!(config.debug);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
storage:
  backend: memory
collection:
  companion_step: 2m
  repeater_step: 15m
report:
  location_name: "Hilltop"
  latitude: 51.5
  longitude: 4.8
logging:
  level: debug
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.collection.companion_step, Duration::from_secs(120));
        assert_eq!(config.collection.repeater_step, Duration::from_secs(900));
        assert_eq!(config.collection.counter_interval_ratio, 0.9);
        assert_eq!(config.report.location_name, "Hilltop");
        assert_eq!(config.report.repeater_display_name, "Repeater Node");
        assert_eq!(config.logging.level.as_str(), "debug");
    }
}
