//! # Engine Configuration
//!
//! Loaded once at startup and read-only afterwards.
//!
//! ## Environment Variables
//! | Variable                       | Required | Default          |
//! |--------------------------------|----------|------------------|
//! | `TRADEBOOK_DB_PATH`            | no       | `./tradebook.db` |
//! | `TRADEBOOK_DEFAULT_WAREHOUSE`  | yes      |                  |
//! | `TRADEBOOK_MAX_CONNECTIONS`    | no       | `5`              |
//! | `TRADEBOOK_BUSY_TIMEOUT_SECS`  | no       | `5`              |
//!
//! There is no implicit "first warehouse" fallback: a deployment names its
//! default warehouse or refuses to start.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tradebook_db::DbConfig;

pub const ENV_DB_PATH: &str = "TRADEBOOK_DB_PATH";
pub const ENV_DEFAULT_WAREHOUSE: &str = "TRADEBOOK_DEFAULT_WAREHOUSE";
pub const ENV_MAX_CONNECTIONS: &str = "TRADEBOOK_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_SECS: &str = "TRADEBOOK_BUSY_TIMEOUT_SECS";

const DEFAULT_DB_PATH: &str = "./tradebook.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key}='{value}' is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub default_warehouse_id: String,
    pub max_connections: u32,
    /// How long a workflow waits for the write lock before `Conflict`.
    pub busy_timeout: Duration,
}

impl EngineConfig {
    pub fn new(database_path: impl Into<PathBuf>, default_warehouse_id: impl Into<String>) -> Self {
        EngineConfig {
            database_path: database_path.into(),
            default_warehouse_id: default_warehouse_id.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_warehouse_id = lookup(ENV_DEFAULT_WAREHOUSE)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing(ENV_DEFAULT_WAREHOUSE))?;

        let database_path = lookup(ENV_DB_PATH)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let max_connections = match lookup(ENV_MAX_CONNECTIONS) {
            Some(value) => parse_positive(ENV_MAX_CONNECTIONS, &value)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let busy_timeout_secs = match lookup(ENV_BUSY_TIMEOUT_SECS) {
            Some(value) => parse_positive(ENV_BUSY_TIMEOUT_SECS, &value)?,
            None => DEFAULT_BUSY_TIMEOUT_SECS,
        };

        Ok(EngineConfig {
            database_path: PathBuf::from(database_path),
            default_warehouse_id,
            max_connections,
            busy_timeout: Duration::from_secs(busy_timeout_secs),
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(self.busy_timeout)
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}
