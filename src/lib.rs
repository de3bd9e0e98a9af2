//! # Secret Cache
//!
//! A node-local cache for secrets consumed by short-lived pods.
//!
//! Pods register the secrets they reference as they are created and release
//! them when they go away. Reads are served from a local copy that is
//! refreshed lazily once its TTL expires, and a secret is dropped from the
//! cache as soon as no registered pod references it.
//!
//! ## Core Components
//!
//! - **Secret managers**: caching and passthrough implementations of one
//!   `get_secret` / `register_pod` / `unregister_pod` contract
//! - **Cache store**: reference-counted, TTL-bounded storage with per-key
//!   fetch coordination and a version-skew guard
//! - **Domain types**: pods, secrets and their identities
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use secret_cache::domain::{Pod, Secret};
//! use secret_cache::secrets::{new_secret_manager, InMemorySecretSource};
//! use secret_cache::{AppConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let source = Arc::new(InMemorySecretSource::new());
//!     source.insert(Secret::new("default", "registry", 0)).await;
//!
//!     let manager = new_secret_manager(&config.cache, source);
//!     let pod = Pod::new("default", "web").with_image_pull_secret("registry");
//!     manager.register_pod(&pod);
//!     let _secret = manager.get_secret("default", "registry").await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::{AppConfig, CacheConfig, ManagerMode, ObservabilityConfig};
pub use errors::{Result, SecretCacheError};
pub use observability::init_observability;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
