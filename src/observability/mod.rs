//! # Observability Infrastructure
//!
//! Structured logging and metrics collection for the secret cache.

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, log_config_info};
pub use metrics::{init_metrics, FetchOutcome, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize all observability components
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_tracing(config)?;

    if config.enable_metrics {
        init_metrics(config)?;
    }

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = %config.enable_metrics,
        "Observability initialized successfully"
    );

    Ok(())
}
