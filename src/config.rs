//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::tracking::transform::TransformMode;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub dsu: DsuConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracking-source (opentrack) endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    #[serde(default = "default_tracking_address")]
    pub bind_address: String,

    #[serde(default = "default_tracking_port")]
    pub port: u16,

    #[serde(default)]
    pub mode: TransformMode,

    /// Reserved: accepted but not applied
    #[serde(default)]
    pub divide_by_gravity: bool,
}

/// DSU server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DsuConfig {
    /// When false the bridge runs in debug mode and only logs raw samples
    #[serde(default = "default_dsu_enabled")]
    pub enabled: bool,

    #[serde(default = "default_dsu_address")]
    pub bind_address: String,

    #[serde(default = "default_dsu_port")]
    pub port: u16,

    /// Fixed server id; a random one is picked when absent
    #[serde(default)]
    pub server_id: Option<u32>,

    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to a daily rolling file
    #[serde(default)]
    pub file: bool,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

// Default value functions
fn default_tracking_address() -> String { "127.0.0.1".to_string() }
fn default_tracking_port() -> u16 { 4242 }

fn default_dsu_enabled() -> bool { true }
fn default_dsu_address() -> String { "127.0.0.1".to_string() }
fn default_dsu_port() -> u16 { 26760 }
fn default_client_timeout_ms() -> u64 { 5000 }

fn default_log_level() -> String { "info".to_string() }
fn default_log_dir() -> String { "./logs".to_string() }

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            bind_address: default_tracking_address(),
            port: default_tracking_port(),
            mode: TransformMode::default(),
            divide_by_gravity: false,
        }
    }
}

impl Default for DsuConfig {
    fn default() -> Self {
        Self {
            enabled: default_dsu_enabled(),
            bind_address: default_dsu_address(),
            port: default_dsu_port(),
            server_id: None,
            client_timeout_ms: default_client_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
            dir: default_log_dir(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}

fn parse_ip(name: &str, value: &str) -> Result<IpAddr> {
    value
        .parse()
        .map_err(|_| invalid(format!("{} '{}' is not a valid IP address", name, value)))
}

impl TrackingConfig {
    /// Socket address to bind the tracking listener to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(parse_ip("tracking.bind_address", &self.bind_address)?, self.port))
    }
}

impl DsuConfig {
    /// Socket address to bind the DSU server to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(parse_ip("dsu.bind_address", &self.bind_address)?, self.port))
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dsu_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let tracking_addr = self.tracking.socket_addr()?;

        if self.tracking.port == 0 {
            return Err(invalid("tracking.port must be non-zero"));
        }

        if self.dsu.enabled {
            let dsu_addr = self.dsu.socket_addr()?;

            if self.dsu.port == 0 {
                return Err(invalid("dsu.port must be non-zero"));
            }

            if dsu_addr == tracking_addr {
                return Err(invalid("tracking and dsu endpoints must differ"));
            }

            if self.dsu.client_timeout_ms == 0 || self.dsu.client_timeout_ms > 60000 {
                return Err(invalid("client_timeout_ms must be between 1 and 60000"));
            }
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level must be one of: trace, debug, info, warn, error"));
        }

        if self.logging.file && self.logging.dir.is_empty() {
            return Err(invalid("logging.dir cannot be empty when file logging is enabled"));
        }

        Ok(())
    }
}
