//! # Configuration Settings
//!
//! Defines the configuration structure for the secret cache.

use crate::errors::{Result, SecretCacheError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Default time-to-live for cached secrets.
pub const DEFAULT_TTL_SECONDS: u64 = 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Cache configuration
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load every section from the environment and validate the result.
    pub fn from_env() -> Result<Self> {
        let config =
            Self { cache: CacheConfig::from_env()?, observability: ObservabilityConfig::from_env()? };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SecretCacheError::from)?;
        Ok(())
    }
}

/// Which secret manager implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerMode {
    /// Reference-counted, TTL-bounded cache in front of the source.
    #[default]
    Caching,
    /// Every read goes straight to the source.
    Simple,
}

impl ManagerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caching => "caching",
            Self::Simple => "simple",
        }
    }
}

impl FromStr for ManagerMode {
    type Err = SecretCacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "caching" | "cache" => Ok(Self::Caching),
            "simple" | "passthrough" => Ok(Self::Simple),
            other => Err(SecretCacheError::config(format!("Unknown manager mode: {}", other))),
        }
    }
}

impl fmt::Display for ManagerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Secret cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// Manager implementation
    pub mode: ManagerMode,

    /// Maximum age of a cached secret before it is refetched
    #[validate(range(min = 1, max = 86400, message = "TTL must be between 1 and 86400 seconds"))]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { mode: ManagerMode::default(), ttl_seconds: DEFAULT_TTL_SECONDS }
    }
}

impl CacheConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("SECRET_CACHE_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => ManagerMode::default(),
        };

        let ttl_seconds = match std::env::var("SECRET_CACHE_TTL_SECONDS") {
            Ok(value) => value.parse::<u64>().map_err(|e| {
                SecretCacheError::config(format!("Invalid SECRET_CACHE_TTL_SECONDS: {}", e))
            })?,
            Err(_) => DEFAULT_TTL_SECONDS,
        };

        let config = Self { mode, ttl_seconds };
        config.validate().map_err(SecretCacheError::from)?;
        Ok(config)
    }

    /// Get the TTL as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to exported metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "secret-cache".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let log_level =
            std::env::var("SECRET_CACHE_LOG_LEVEL").unwrap_or_else(|_| defaults.log_level.clone());

        let json_logging = std::env::var("SECRET_CACHE_JSON_LOGS")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.json_logging);

        let enable_metrics = std::env::var("SECRET_CACHE_ENABLE_METRICS")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.enable_metrics);

        let metrics_port = match std::env::var("SECRET_CACHE_METRICS_PORT") {
            Ok(value) => value.parse::<u16>().map_err(|e| {
                SecretCacheError::config(format!("Invalid SECRET_CACHE_METRICS_PORT: {}", e))
            })?,
            Err(_) => defaults.metrics_port,
        };

        Ok(Self {
            enable_metrics,
            metrics_port,
            service_name: defaults.service_name,
            log_level,
            json_logging,
        })
    }

    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}
