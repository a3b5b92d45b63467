//! Driver configuration using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (base configuration)
//! 2. environment variables prefixed with `DAQ_BINDINGS__`, nested with `__`
//!
//! # Example
//! ```no_run
//! use daq_bindings::config::DriverConfig;
//!
//! let config = DriverConfig::load_from("config/ls350.toml")?;
//! config.validate()?;
//! println!("settle delay: {:?}", config.transport.settle_delay);
//! # Ok::<(), daq_bindings::config::ConfigError>(())
//! ```
//!
//! ```toml
//! name = "LS350"
//!
//! [logging]
//! level = "debug"
//!
//! [transport]
//! settle_delay = "50ms"
//! timeout = "3s"
//! read_terminator = "\r\n"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DAQ_BINDINGS__";

/// Failure to load, check or render a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong shape.
    #[error("Configuration error: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Loaded values break a constraint checked by `validate`.
    #[error("Configuration validation error: {0}")]
    Invalid(String),

    /// Serialization to TOML failed.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// Top-level configuration for one driver instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Instrument name used in logs and errors
    pub name: String,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Transport pacing and framing
    pub transport: TransportConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "instrument".to_string(),
            logging: LoggingConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Transport framing and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Minimum quiet interval after each operation before the next one
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Maximum wait for a complete reply
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Appended to outgoing commands
    pub write_terminator: String,
    /// Marks the end of a reply
    pub read_terminator: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(50),
            timeout: Duration::from_secs(3),
            write_terminator: "\r\n".to_string(),
            read_terminator: "\r\n".to_string(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file, then environment overrides.
    ///
    /// Missing keys fall back to defaults. Example override:
    /// `DAQ_BINDINGS__TRANSPORT__SETTLE_DELAY=100ms`
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::figment(path).extract().map_err(ConfigError::from)
    }

    /// The provider stack used by [`DriverConfig::load_from`].
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(DriverConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name cannot be empty".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        if self.transport.read_terminator.is_empty() {
            return Err(ConfigError::Invalid(
                "transport.read_terminator cannot be empty".to_string(),
            ));
        }

        if self.transport.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "transport.timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML, e.g. to write a starter configuration file.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
