//! # Configuration Management
//!
//! Environment-driven configuration for the secret cache and its
//! observability stack.

pub mod settings;

pub use settings::{
    AppConfig, CacheConfig, ManagerMode, ObservabilityConfig, DEFAULT_TTL_SECONDS,
};
