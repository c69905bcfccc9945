//! Tstat transport configuration loading and validation.
//!
//! This crate provides:
//! - Typed structs for the TOML configuration file
//! - An explicit validation pass with descriptive errors
//! - Environment overrides for credentials
//! - Sensor identifier resolution (CLI flag → config → local hostname)
//!
//! Configuration problems are fatal before any directory is processed; the
//! binary validates the whole file up front and only then opens a transport
//! connection.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable that overrides the configured broker password.
pub const ENV_PASSWORD: &str = "TSTAT_SEND_PASSWORD";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for tt_common::Error {
    fn from(err: ConfigError) -> Self {
        tt_common::Error::Config(err.to_string())
    }
}

/// Broker settings from the `[rabbit]` table.
///
/// `host` and `queue` are required; everything else has the conventional
/// default. Transport-layer security and credentials are carried here and
/// consumed by the transport implementation.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_vhost")]
    pub vhost: String,
    #[serde(default)]
    pub use_ssl: bool,
    pub queue: String,
    /// Exchange to publish to; empty selects the default exchange.
    #[serde(default)]
    pub exchange: String,
    /// Routing key; empty falls back to the queue name.
    #[serde(default)]
    pub routing_key: String,
    /// Declare the queue as durable.
    #[serde(default)]
    pub durable_queue: bool,
}

fn default_port() -> u16 {
    5672
}

fn default_vhost() -> String {
    "/".to_string()
}

impl RabbitConfig {
    /// The routing key to publish with: the configured key, or the queue
    /// name when no key is configured.
    pub fn routing_key(&self) -> &str {
        if self.routing_key.is_empty() {
            &self.queue
        } else {
            &self.routing_key
        }
    }
}

/// Optional `[sensor]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorConfig {
    /// Sensor identifier stamped into every record's meta stanza.
    pub id: Option<String>,
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rabbit: RabbitConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
}

impl Config {
    /// Load a configuration file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no overrides, no validation).
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides for credential material.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            self.rabbit.password = password;
        }
    }

    /// Semantic validation beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rabbit = &self.rabbit;
        if rabbit.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "[rabbit] host must not be empty".to_string(),
            ));
        }
        if rabbit.host.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "[rabbit] host {:?} is not a valid hostname",
                rabbit.host
            )));
        }
        if rabbit.port == 0 {
            return Err(ConfigError::Invalid(
                "[rabbit] port must be non-zero".to_string(),
            ));
        }
        if rabbit.queue.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "[rabbit] queue must not be empty".to_string(),
            ));
        }
        if rabbit.vhost.is_empty() {
            return Err(ConfigError::Invalid(
                "[rabbit] vhost must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the sensor identifier: CLI override, then the config file,
    /// then the local host's network name.
    pub fn resolve_sensor_id(&self, cli_override: Option<&str>) -> String {
        if let Some(id) = cli_override {
            return id.to_string();
        }
        if let Some(id) = &self.sensor.id {
            return id.clone();
        }
        local_hostname()
    }
}

/// The local host's network name, or "localhost" if it cannot be resolved.
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
