//! Runtime configuration loaded from environment variables.
//!
//! Database credentials are only ever read from the environment; the URL is
//! never logged; [`DatabaseConfig::target`] gives a credential-free label.

use sqlx::postgres::PgConnectOptions;
use std::env;
use std::fmt;
use std::time::Duration;

pub const DATABASE_URL_VAR: &str = "INBOX_DATABASE_URL";

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_duration_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{var} is not a valid postgres URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Connection settings for the email store.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub connect_options: PgConnectOptions,
    pub max_connections: u32,
    /// Pool acquire timeout; `None` keeps the driver default.
    pub acquire_timeout: Option<Duration>,
    /// Attempt the first connection at liftoff instead of on the first request.
    pub eager_connect: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var(DATABASE_URL_VAR).map_err(|_| ConfigError::Missing(DATABASE_URL_VAR))?;
        let mut config = Self::from_url(&url)?;
        config.max_connections = env_u32("INBOX_DATABASE_MAX_CONNECTIONS", 10);
        config.acquire_timeout = env_duration_millis("INBOX_DATABASE_ACQUIRE_TIMEOUT_MS");
        config.eager_connect = env_bool("INBOX_DATABASE_EAGER_CONNECT", true);
        Ok(config)
    }

    /// Build a config with defaults from an explicit URL.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let connect_options: PgConnectOptions =
            url.trim().parse().map_err(|source| ConfigError::InvalidUrl {
                var: DATABASE_URL_VAR,
                source,
            })?;

        Ok(Self::from_options(connect_options))
    }

    pub fn from_options(connect_options: PgConnectOptions) -> Self {
        Self {
            connect_options,
            max_connections: 10,
            acquire_timeout: None,
            eager_connect: true,
        }
    }

    /// `host:port/database`, safe to print.
    pub fn target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.connect_options.get_host(),
            self.connect_options.get_port(),
            self.connect_options.get_database().unwrap_or("postgres")
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("target", &self.target())
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("eager_connect", &self.eager_connect)
            .finish()
    }
}
