// Service configuration loaded from the environment

use std::time::Duration;

use thiserror::Error;

use crate::pricing::metrics::DEFAULT_SLOW_THRESHOLD_MS;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub db_max_connections: u32,
    pub slow_pricing_threshold: Duration,
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let parsed = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name, value }),
            }
        };

        let port = parsed("PORT", 8080)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port.to_string(),
        })?;
        let db_max_connections = parsed("DB_MAX_CONNECTIONS", 5)?;
        let db_max_connections = u32::try_from(db_max_connections).map_err(|_| ConfigError::Invalid {
            name: "DB_MAX_CONNECTIONS",
            value: db_max_connections.to_string(),
        })?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            jwt_secret: required("JWT_SECRET")?,
            db_max_connections,
            slow_pricing_threshold: Duration::from_millis(parsed(
                "SLOW_PRICING_THRESHOLD_MS",
                DEFAULT_SLOW_THRESHOLD_MS,
            )?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
