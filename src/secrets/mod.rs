//! Pod-scoped secret caching.
//!
//! This module caches secrets on behalf of pods. The cache avoids hitting
//! the remote source on every read, bounds staleness with a TTL, and keeps a
//! secret only while at least one registered pod references it.
//!
//! # Architecture
//!
//! - [`Clock`]: injectable time source ([`SystemClock`], [`FakeClock`])
//! - [`SecretSource`]: fetches one secret by namespace and name
//! - [`CacheStore`]: reference-counted, TTL-aware store with per-key locking
//! - [`RegistrationTable`]: which keys each pod referenced last time
//! - [`SecretManager`]: the `get_secret` / `register_pod` / `unregister_pod`
//!   contract, implemented by [`CachingSecretManager`] and
//!   [`SimpleSecretManager`]
//!
//! # Example
//!
//! ```rust,ignore
//! use secret_cache::config::CacheConfig;
//! use secret_cache::secrets::{new_secret_manager, InMemorySecretSource};
//!
//! let source = Arc::new(InMemorySecretSource::new());
//! let manager = new_secret_manager(&CacheConfig::default(), source);
//!
//! manager.register_pod(&pod);
//! let secret = manager.get_secret("default", "registry-creds").await?;
//! manager.unregister_pod(&pod);
//! ```

pub mod clock;
pub mod manager;
pub mod registration;
pub mod source;
pub mod store;

pub use clock::{Clock, FakeClock, SystemClock};
pub use manager::{new_secret_manager, CachingSecretManager, SecretManager, SimpleSecretManager};
pub use registration::{RegistrationDelta, RegistrationTable};
pub use source::{InMemorySecretSource, SecretSource};
pub use store::CacheStore;
