//! CLI configuration

use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use infra_db::DatabaseConfig;

/// Application configuration, read from `BANK_*` environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database URL
    pub database_url: String,
    /// Log level, used when `RUST_LOG` is not set
    pub log_level: String,
    /// Directory rendered reports are written to
    pub output_dir: PathBuf,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/bank".to_string(),
            log_level: "info".to_string(),
            output_dir: PathBuf::from("reports"),
            max_connections: 10,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::with_prefix("BANK").try_parsing(true))
    }

    fn from_source(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// Pool settings for this configuration
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url).max_connections(self.max_connections)
    }
}
