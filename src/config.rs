use std::net::SocketAddr;
use std::str::FromStr;

use sqlx::postgres::PgSslMode;
use thiserror::Error;
use url::Url;

use crate::logging::{LoggingConfig, DEFAULT_LOG_LEVEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be set when {reason}")]
    Missing { key: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: PgSslMode,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub jwt_secret: Option<String>,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            host: get("DB_HOST", "localhost"),
            port: parse("DB_PORT", get("DB_PORT", "5432"))?,
            user: get("DB_USER", "postgres"),
            password: get("DB_PASSWORD", "gobank"),
            name: get("DB_NAME", "postgres"),
            ssl_mode: parse("DB_SSLMODE", get("DB_SSLMODE", "disable"))?,
            max_connections: parse("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS", "10"))?,
        };

        let loki_enabled: bool = parse("LOKI_ENABLED", get("LOKI_ENABLED", "false"))?;
        let loki_url = if loki_enabled {
            let raw = lookup("LOKI_URL").ok_or(ConfigError::Missing {
                key: "LOKI_URL",
                reason: "LOKI_ENABLED is true",
            })?;
            Some(parse::<Url>("LOKI_URL", raw)?)
        } else {
            None
        };

        let logging = LoggingConfig {
            loki_url,
            service_name: get("SERVICE_NAME", "account-api"),
            environment: get("ENVIRONMENT", "development"),
            log_level: get("RUST_LOG", DEFAULT_LOG_LEVEL),
        };

        Ok(Self {
            listen_addr: parse("LISTEN_ADDR", get("LISTEN_ADDR", "0.0.0.0:3000"))?,
            storage: parse("STORAGE_BACKEND", get("STORAGE_BACKEND", "postgres"))?,
            database,
            jwt_secret: lookup("JWT_SECRET").filter(|secret| !secret.is_empty()),
            logging,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
