//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geo::UNKNOWN_COUNTRY;

use super::validation::{ConfigError, parse_duration};

// =============================================================================
// Constants
// =============================================================================

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_checkpoint_interval() -> String {
    "5s".to_string()
}

fn default_country() -> String {
    UNKNOWN_COUNTRY.to_string()
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: String,

    /// MPSC channel capacity for write commands (default: 10000).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// WAL checkpoint interval (default: "5s").
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tally.db".to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            checkpoint_interval: "5s".to_string(),
        }
    }
}

// =============================================================================
// Geo Configuration
// =============================================================================

/// One address-prefix-to-country rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoRule {
    /// Textual address prefix, e.g. "192.168.".
    pub prefix: String,

    /// Country code assigned to matching addresses.
    pub country: String,
}

/// Country lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Code for addresses no rule matches (default: "ZZ").
    pub default_country: String,

    /// Prefix rules, checked in order; first match wins.
    pub rules: Vec<GeoRule>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            default_country: default_country(),
            rules: Vec::new(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server configuration.
    pub server: ServerConfig,

    /// Database configuration.
    pub database: DatabaseConfig,

    /// Country lookup configuration.
    pub geo: GeoConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        // Validate channel capacity
        if self.database.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "database channel_capacity must be positive".to_string(),
            ));
        }

        // Validate checkpoint interval
        parse_duration(&self.database.checkpoint_interval).map_err(|e| {
            ConfigError::ValidationError(format!("database checkpoint_interval: {}", e))
        })?;

        // Validate geo rules
        if self.geo.default_country.is_empty() {
            return Err(ConfigError::ValidationError(
                "geo default_country must not be empty".to_string(),
            ));
        }
        for rule in &self.geo.rules {
            if rule.prefix.is_empty() || rule.country.is_empty() {
                return Err(ConfigError::ValidationError(
                    "geo rules need a non-empty prefix and country".to_string(),
                ));
            }
        }

        Ok(())
    }
}
