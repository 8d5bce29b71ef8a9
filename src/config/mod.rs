//! Plugin configuration.
//!
//! Aggregates transport and limit settings into a single Config struct
//! that can be loaded from YAML files or environment variables. Every field
//! has a default, so the plugin runs with no configuration at all.

pub mod limits;

pub use limits::{ResourceLimits, DEFAULT_QUEUE_CAPACITY, MAX_MESSAGE_SIZE};

use serde::Deserialize;

use crate::transport::TransportConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "broadcaster.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "BROADCASTER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "BROADCASTER";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "BROADCASTER_LOG";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Main plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publish socket configuration.
    pub transport: TransportConfig,
    /// Queue limits.
    pub limits: ResourceLimits,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `broadcaster.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `BROADCASTER__TRANSPORT__PORT=5557`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing: ephemeral port on loopback.
    pub fn for_test() -> Self {
        Self {
            transport: TransportConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            limits: ResourceLimits::default(),
        }
    }
}
