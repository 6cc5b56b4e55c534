//! PostgreSQL pool settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Pool bounds and timeouts for the user and policy stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Upper bound on open connections.
    #[serde(default = "default_max_open")]
    pub max_open_connections: u32,
    /// Connections kept warm while the server is idle.
    #[serde(default = "default_max_idle")]
    pub max_idle_connections: u32,
    /// Connections older than this are recycled.
    #[serde(default = "default_lifetime")]
    pub max_connection_lifetime_seconds: u64,
    /// How long a request waits for a free connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// A config pointing at `url` with default pool bounds.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_open_connections: default_max_open(),
            max_idle_connections: default_max_idle(),
            max_connection_lifetime_seconds: default_lifetime(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_connection_lifetime_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Idle connections beyond the open limit are clamped rather than rejected.
    pub fn min_connections(&self) -> u32 {
        self.max_idle_connections.min(self.max_open_connections)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() {
            return Err(AppError::configuration("database.url must be set"));
        }
        if self.max_open_connections == 0 {
            return Err(AppError::configuration(
                "database.max_open_connections must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_max_open() -> u32 {
    100
}

fn default_max_idle() -> u32 {
    10
}

fn default_lifetime() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}
