use std::time::Duration;

use studyhub_core::clone::CloneConfig;
use studyhub_core::error::CoreError;
use studyhub_core::retry::RetryPolicy;

/// Server configuration loaded from environment variables.
///
/// All fields except `database_url` have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Postgres connection string.
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Upper bound on concurrent asset copies per clone (default: `8`).
    pub asset_copy_concurrency: usize,
    /// Attempts per storage operation, first try included (default: `3`).
    pub asset_copy_max_attempts: u32,
    /// Timeout of a single storage attempt in seconds (default: `30`).
    pub asset_copy_timeout_secs: u64,
    /// Delay before the first retry in milliseconds (default: `200`).
    pub asset_copy_initial_backoff_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3000`                  |
    /// | `DATABASE_URL`                  | (required)              |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `30`                    |
    /// | `ASSET_COPY_CONCURRENCY`        | `8`                     |
    /// | `ASSET_COPY_MAX_ATTEMPTS`       | `3`                     |
    /// | `ASSET_COPY_TIMEOUT_SECS`       | `30`                    |
    /// | `ASSET_COPY_INITIAL_BACKOFF_MS` | `200`                   |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".into()))?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Self {
            host,
            port: parse_or(&lookup, "PORT", 3000)?,
            database_url,
            cors_origins,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?,
            asset_copy_concurrency: parse_or(&lookup, "ASSET_COPY_CONCURRENCY", 8)?,
            asset_copy_max_attempts: parse_or(&lookup, "ASSET_COPY_MAX_ATTEMPTS", 3)?,
            asset_copy_timeout_secs: parse_or(&lookup, "ASSET_COPY_TIMEOUT_SECS", 30)?,
            asset_copy_initial_backoff_ms: parse_or(
                &lookup,
                "ASSET_COPY_INITIAL_BACKOFF_MS",
                200,
            )?,
        };

        if config.asset_copy_concurrency == 0 {
            return Err(CoreError::Validation(
                "ASSET_COPY_CONCURRENCY must be at least 1".into(),
            ));
        }
        if config.asset_copy_max_attempts == 0 {
            return Err(CoreError::Validation(
                "ASSET_COPY_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    /// Cloner settings derived from the `ASSET_COPY_*` variables.
    pub fn clone_config(&self) -> CloneConfig {
        CloneConfig {
            max_concurrent_copies: self.asset_copy_concurrency,
            retry: RetryPolicy {
                max_attempts: self.asset_copy_max_attempts,
                initial_delay: Duration::from_millis(self.asset_copy_initial_backoff_ms),
                attempt_timeout: Duration::from_secs(self.asset_copy_timeout_secs),
                ..RetryPolicy::default()
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, CoreError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}
