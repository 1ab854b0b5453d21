//! Configuration management for the CLI.

use mirror_engine::Collection;
use std::env;
use std::time::Duration;

/// Default remote API base URL.
pub const DEFAULT_API_URL: &str = "https://api.ynab.com/v1";

/// Each partition pass holds one connection for its lease and needs another
/// for writes; every collection may be reconciled at once.
pub const MIN_CONNECTIONS: u32 = Collection::ALL.len() as u32 + 1;

/// Configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Personal access token for the remote API, if set in the environment
    pub api_token: Option<String>,
    /// Remote API base URL
    pub api_url: String,
    /// PostgreSQL connection URL; mirroring is enabled when present
    pub database_url: Option<String>,
    /// Connection pool size for the mirror database
    pub max_connections: u32,
    /// Timeout applied to every remote request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = env::var("YNAB_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let api_url = env::var("YNAB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

        let max_connections = env::var("MIRROR_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= MIN_CONNECTIONS)
            .ok_or(ConfigError::InvalidMaxConnections)?;

        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidTimeout)?;

        Ok(Self {
            api_token,
            api_url,
            database_url,
            max_connections,
            http_timeout,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid MIRROR_MAX_CONNECTIONS value (minimum {})", MIN_CONNECTIONS)]
    InvalidMaxConnections,

    #[error("Invalid HTTP_TIMEOUT_SECS value")]
    InvalidTimeout,

    #[error("No API token: set YNAB_TOKEN or enter one when prompted")]
    MissingToken,
}
