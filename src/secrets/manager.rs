//! Secret managers: the entry point pods and readers talk to.
//!
//! Two implementations share the [`SecretManager`] contract:
//!
//! - [`CachingSecretManager`] keeps a local copy of every secret referenced by
//!   a registered pod. Creating or updating a pod invalidates the cached
//!   copies of its secrets; a read serves from the cache and fetches only
//!   when the entry is missing, invalidated or older than the TTL.
//! - [`SimpleSecretManager`] fetches from the source on every read and
//!   ignores registrations.
//!
//! The implementation is picked once, by [`new_secret_manager`].

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::registration::RegistrationTable;
use super::source::SecretSource;
use super::store::CacheStore;
use crate::config::{CacheConfig, ManagerMode};
use crate::domain::{ObjectKey, Pod, Secret};
use crate::errors::Result;
use crate::observability::MetricsRecorder;

/// Access to secrets on behalf of pods.
///
/// `register_pod` and `unregister_pod` sit on the pod lifecycle path and must
/// stay cheap: they never perform network I/O.
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Get a secret by namespace and name.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Arc<Secret>>;

    /// Register every secret referenced by `pod`.
    fn register_pod(&self, pod: &Pod);

    /// Release the secrets of `pod` that no other registered pod references.
    fn unregister_pod(&self, pod: &Pod);
}

/// Build the manager selected by `config`, backed by the wall clock.
pub fn new_secret_manager(
    config: &CacheConfig,
    source: Arc<dyn SecretSource>,
) -> Arc<dyn SecretManager> {
    info!(mode = %config.mode, ttl_seconds = config.ttl_seconds, "Creating secret manager");
    match config.mode {
        ManagerMode::Caching => {
            Arc::new(CachingSecretManager::new(source, Arc::new(SystemClock), config.ttl()))
        }
        ManagerMode::Simple => Arc::new(SimpleSecretManager::new(source)),
    }
}

/// Passthrough manager that always asks the source.
#[derive(Debug)]
pub struct SimpleSecretManager {
    source: Arc<dyn SecretSource>,
}

impl SimpleSecretManager {
    pub fn new(source: Arc<dyn SecretSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SecretManager for SimpleSecretManager {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Arc<Secret>> {
        self.source.fetch(namespace, name).await.map(Arc::new)
    }

    fn register_pod(&self, _pod: &Pod) {}

    fn unregister_pod(&self, _pod: &Pod) {}
}

/// Manager keeping a reference-counted cache of all secrets needed by
/// registered pods.
#[derive(Debug)]
pub struct CachingSecretManager {
    store: CacheStore,
    registrations: Mutex<RegistrationTable>,
    metrics: MetricsRecorder,
}

impl CachingSecretManager {
    pub fn new(source: Arc<dyn SecretSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store: CacheStore::new(source, clock, ttl),
            registrations: Mutex::new(RegistrationTable::new()),
            metrics: MetricsRecorder::new(),
        }
    }

    fn lock_registrations(&self) -> MutexGuard<'_, RegistrationTable> {
        self.registrations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The underlying store, for inspection.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn registered_pod_count(&self) -> usize {
        self.lock_registrations().len()
    }

    /// Reference count currently held on a secret.
    pub fn ref_count(&self, namespace: &str, name: &str) -> usize {
        self.store.ref_count(&ObjectKey::new(namespace, name))
    }
}

#[async_trait]
impl SecretManager for CachingSecretManager {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Arc<Secret>> {
        self.store.get(&ObjectKey::new(namespace, name)).await
    }

    fn register_pod(&self, pod: &Pod) {
        let pod_key = pod.key();
        let keys = pod.secret_keys();

        // Held across the store updates so concurrent registrations of the
        // same pod apply their deltas in order.
        let mut registrations = self.lock_registrations();
        let delta = registrations.register(pod_key.clone(), keys);

        for key in &delta.added {
            self.store.add(key);
        }
        for key in &delta.retained {
            self.store.invalidate(key);
        }
        for key in &delta.removed {
            self.store.delete(key);
        }

        self.metrics.set_registered_pods(registrations.len());
        debug!(
            pod = %pod_key,
            added = delta.added.len(),
            retained = delta.retained.len(),
            removed = delta.removed.len(),
            "Registered pod secrets"
        );
    }

    fn unregister_pod(&self, pod: &Pod) {
        let pod_key = pod.key();

        let mut registrations = self.lock_registrations();
        let Some(keys) = registrations.unregister(&pod_key) else {
            debug!(pod = %pod_key, "Ignoring unregister of unknown pod");
            return;
        };

        for key in &keys {
            self.store.delete(key);
        }

        self.metrics.set_registered_pods(registrations.len());
        debug!(pod = %pod_key, released = keys.len(), "Unregistered pod secrets");
    }
}
