//! Runtime configuration loaded from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | unset | Postgres connection string; unset selects the in-memory store |
//! | `FLEETRENT_STORE_TIMEOUT_MS` | `5000` | bound on every record store call |
//! | `FLEETRENT_DB_MAX_CONNECTIONS` | `5` | Postgres pool size |
//! | `FLEETRENT_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub store_timeout: Duration,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store_timeout = match get("FLEETRENT_STORE_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(invalid("FLEETRENT_STORE_TIMEOUT_MS", "positive integer", raw)),
            },
            None => DEFAULT_STORE_TIMEOUT,
        };

        let db_max_connections = match get("FLEETRENT_DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("FLEETRENT_DB_MAX_CONNECTIONS", "positive integer", raw)),
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let raw_addr = get("FLEETRENT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|_| invalid("FLEETRENT_BIND_ADDR", "socket address", raw_addr.clone()))?;

        Ok(Self {
            database_url: get("DATABASE_URL"),
            store_timeout,
            db_max_connections,
            bind_addr,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

fn invalid(var: &'static str, expected: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://fleet@localhost/fleet"),
            ("FLEETRENT_STORE_TIMEOUT_MS", "250"),
            ("FLEETRENT_DB_MAX_CONNECTIONS", "12"),
            ("FLEETRENT_BIND_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://fleet@localhost/fleet"));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.db_max_connections, 12);
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("FLEETRENT_STORE_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FLEETRENT_STORE_TIMEOUT_MS", .. }));

        let err = AppConfig::from_lookup(lookup(&[("FLEETRENT_STORE_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FLEETRENT_STORE_TIMEOUT_MS", .. }));

        let err = AppConfig::from_lookup(lookup(&[("FLEETRENT_DB_MAX_CONNECTIONS", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FLEETRENT_DB_MAX_CONNECTIONS", .. }));

        let err = AppConfig::from_lookup(lookup(&[("FLEETRENT_BIND_ADDR", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FLEETRENT_BIND_ADDR", .. }));
    }
}
