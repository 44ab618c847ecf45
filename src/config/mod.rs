//! Configuration module for the Tally application.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Database settings (path, channel capacity, checkpoint interval)
//! - Country lookup rules

mod app;
mod validation;

pub use app::{AppConfig, DatabaseConfig, GeoConfig, GeoRule, ServerConfig};
pub use validation::{ConfigError, parse_duration};

// Re-export constants
pub use app::DEFAULT_CHANNEL_CAPACITY;
