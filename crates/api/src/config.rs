use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use hostel_core::manager::{BookingConfig, DEFAULT_STORAGE_TIMEOUT};
use hostel_core::reference::DEFAULT_MAX_REFERENCE_ATTEMPTS;

/// Configuration could not be loaded from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Upper bound on pooled database connections (default: `20`).
    pub database_max_connections: u32,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Bound on each booking store call in milliseconds (default: `5000`).
    pub storage_timeout_ms: u64,
    /// Fresh references tried per creation (default: `5`).
    pub max_reference_attempts: u32,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `DATABASE_URL`             | required                   |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`                       |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `STORAGE_TIMEOUT_MS`       | `5000`                     |
    /// | `MAX_REFERENCE_ATTEMPTS`   | `5`                        |
    /// | `LOG_FORMAT`               | `pretty`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database_max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 20)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            if let Err(e) = origin.parse::<HeaderValue>() {
                return Err(ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    value: origin.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let storage_timeout_ms: u64 = parse_or(
            &lookup,
            "STORAGE_TIMEOUT_MS",
            DEFAULT_STORAGE_TIMEOUT.as_millis() as u64,
        )?;
        let max_reference_attempts: u32 = parse_or(
            &lookup,
            "MAX_REFERENCE_ATTEMPTS",
            DEFAULT_MAX_REFERENCE_ATTEMPTS,
        )?;
        if max_reference_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_REFERENCE_ATTEMPTS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        if request_timeout_secs.saturating_mul(1000) <= storage_timeout_ms {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                value: request_timeout_secs.to_string(),
                reason: format!("must exceed STORAGE_TIMEOUT_MS ({storage_timeout_ms} ms)"),
            });
        }

        let log_format: LogFormat = parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty)?;

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections,
            cors_origins,
            request_timeout_secs,
            storage_timeout_ms,
            max_reference_attempts,
            log_format,
        })
    }

    /// Tunables handed to the booking manager.
    pub fn booking_config(&self) -> BookingConfig {
        BookingConfig {
            storage_timeout: Duration::from_millis(self.storage_timeout_ms),
            max_reference_attempts: self.max_reference_attempts,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
