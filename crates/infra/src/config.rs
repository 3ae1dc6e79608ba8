//! Configuration loading and representation.
//!
//! Values come from environment variables. Parsing goes through a lookup
//! function so tests can supply variables without touching the process env.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_COLLECTION: &str = "pantry";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which backing store to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String },
}

/// Settings of the inventory service and its backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Collection holding one document per item.
    pub collection: String,
    /// Bound applied to every backing-store call.
    pub timeout: Duration,
    /// Read-modify-write attempts before giving up on a contended record.
    pub max_attempts: u32,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    pub backend: StoreBackend,
    pub store: StoreConfig,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::InMemory,
            store: StoreConfig::default(),
        }
    }
}

impl InfraConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("PANTRY_STORE").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StoreBackend::InMemory,
            Some("postgres") => StoreBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "PANTRY_STORE",
                    value: other.to_string(),
                    reason: "expected `memory` or `postgres`".to_string(),
                });
            }
        };

        let collection = match lookup("PANTRY_COLLECTION") {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::Invalid {
                    var: "PANTRY_COLLECTION",
                    value: v,
                    reason: "cannot be blank".to_string(),
                });
            }
            Some(v) => v.trim().to_string(),
            None => DEFAULT_COLLECTION.to_string(),
        };

        let timeout = parse_var::<u64, _>(&lookup, "PANTRY_STORE_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "PANTRY_STORE_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let max_attempts =
            parse_var::<u32, _>(&lookup, "PANTRY_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "PANTRY_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let max_connections = parse_var::<u32, _>(&lookup, "PANTRY_MAX_CONNECTIONS")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
            .max(1);

        Ok(Self {
            backend,
            store: StoreConfig {
                collection,
                timeout,
                max_attempts,
                max_connections,
            },
        })
    }
}

/// Parse an optional variable; unset or blank means `None`.
pub fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => v.trim().parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
            var,
            value: v.clone(),
            reason: e.to_string(),
        }),
    }
}
