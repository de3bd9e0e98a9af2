//! # Metrics Collection
//!
//! Prometheus metrics for the secret cache. Recording through the `metrics`
//! facade is a no-op until [`init_metrics`] installs an exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SecretCacheError};
use ::tracing::{info, warn};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Outcome label attached to `secret_cache_fetches_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    NotFound,
    Error,
}

impl FetchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

/// Metrics recorder that tracks cache activity
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record one completed call to the secret source
    pub fn record_fetch(&self, outcome: FetchOutcome, duration: f64) {
        let labels = [("outcome", outcome.as_str().to_string())];
        counter!("secret_cache_fetches_total", &labels).increment(1);
        histogram!("secret_cache_fetch_duration_seconds").record(duration);
    }

    /// Record a read served from a fresh snapshot
    pub fn record_hit(&self) {
        counter!("secret_cache_hits_total").increment(1);
    }

    /// Record a read that kept serving a previous result after a failed refresh
    pub fn record_stale_served(&self) {
        counter!("secret_cache_stale_served_total").increment(1);
    }

    /// Record a fetched secret discarded because it was older than the cached one
    pub fn record_version_skew(&self) {
        counter!("secret_cache_version_skew_rejections_total").increment(1);
    }

    /// Record a key dropped after its last reference went away
    pub fn record_eviction(&self) {
        counter!("secret_cache_evictions_total").increment(1);
    }

    /// Update the gauge of keys currently held by the store
    pub fn set_cached_items(&self, count: usize) {
        gauge!("secret_cache_items").set(count as f64);
    }

    /// Update the gauge of pods with a live registration
    pub fn set_registered_pods(&self, count: usize) {
        gauge!("secret_cache_registered_pods").set(count as f64);
    }

    fn describe(&self) {
        describe_counter!(
            "secret_cache_fetches_total",
            Unit::Count,
            "Calls to the secret source, labelled by outcome"
        );
        describe_histogram!(
            "secret_cache_fetch_duration_seconds",
            Unit::Seconds,
            "Latency of calls to the secret source"
        );
        describe_counter!(
            "secret_cache_hits_total",
            Unit::Count,
            "Reads answered from a fresh snapshot"
        );
        describe_counter!(
            "secret_cache_stale_served_total",
            Unit::Count,
            "Reads that served a previous result after a failed refresh"
        );
        describe_counter!(
            "secret_cache_version_skew_rejections_total",
            Unit::Count,
            "Fetched secrets dropped for being older than the cached version"
        );
        describe_counter!(
            "secret_cache_evictions_total",
            Unit::Count,
            "Keys removed after their last reference was released"
        );
        describe_gauge!("secret_cache_items", Unit::Count, "Keys currently held by the store");
        describe_gauge!(
            "secret_cache_registered_pods",
            Unit::Count,
            "Pods with an active registration"
        );
    }
}

/// Install the Prometheus exporter and describe cache metrics
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        SecretCacheError::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| {
            SecretCacheError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    MetricsRecorder::new().describe();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}
