//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//!
//! Secret values never reach the log: every field recorded by the cache is a
//! namespace, a name, a count or an outcome label.

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SecretCacheError};
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for a cache operation on one secret.
///
/// ```rust,ignore
/// let span = cache_span!("get", "default", "registry-creds");
/// ```
#[macro_export]
macro_rules! cache_span {
    ($operation:expr, $namespace:expr, $name:expr) => {
        tracing::debug_span!(
            "secret_cache",
            operation = %$operation,
            namespace = %$namespace,
            secret = %$name
        )
    };
    ($operation:expr, $namespace:expr, $name:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "secret_cache",
            operation = %$operation,
            namespace = %$namespace,
            secret = %$name,
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Installing twice is
/// not an error; the first subscriber stays in place.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            SecretCacheError::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed, keeping it");
    }
    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        mode = %config.cache.mode,
        ttl_seconds = config.cache.ttl_seconds,
        metrics_enabled = %config.observability.enable_metrics,
        json_logging = %config.observability.json_logging,
        "Secret cache configuration"
    );
}
