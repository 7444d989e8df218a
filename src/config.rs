//! Application configuration

use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::StationError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Value expected in the `X-API-Key` header, no guard when unset
    pub api_key: Option<String>,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres://...` for PostGIS, `memory://` for the in-process store
    pub url: String,
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub connect_timeout: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Bound on the whole fetch of the remote dataset
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.bind", "0.0.0.0:8080")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5)?
            .set_default("database.connect_timeout", 10)?
            .set_default("import.timeout", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("STATIONS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), StationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.import.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, StationError> {
        self.bind
            .parse()
            .map_err(|e| StationError::Configuration {
                message: format!("Invalid bind address {:?}: {}", self.bind, e),
            })
    }

    fn validate(&self) -> Result<(), StationError> {
        self.bind_addr()?;
        if matches!(&self.api_key, Some(key) if key.trim().is_empty()) {
            return Err(StationError::Configuration {
                message: "API key cannot be blank".to_string(),
            });
        }
        Ok(())
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), StationError> {
        if self.url.trim().is_empty() {
            return Err(StationError::Configuration {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(StationError::Configuration {
                message: "Connection pool size must be greater than zero".to_string(),
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(StationError::Configuration {
                message: "Connect timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl ImportConfig {
    fn validate(&self) -> Result<(), StationError> {
        if self.timeout.is_zero() {
            return Err(StationError::Configuration {
                message: "Import timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
