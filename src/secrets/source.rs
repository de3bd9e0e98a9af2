//! Remote source of secret objects.
//!
//! The cache only ever asks the source for one object by namespace and name.
//! A source reports a missing object with [`SecretCacheError::NotFound`];
//! every other error is treated as transient.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{ObjectKey, Secret};
use crate::errors::{Result, SecretCacheError};

/// Authoritative source the cache fetches from.
#[async_trait]
pub trait SecretSource: Send + Sync + fmt::Debug {
    /// Fetch one secret.
    ///
    /// # Errors
    ///
    /// - [`SecretCacheError::NotFound`] if the secret does not exist
    /// - [`SecretCacheError::Fetch`] for any other failure
    async fn fetch(&self, namespace: &str, name: &str) -> Result<Secret>;
}

/// In-process source backed by a map, for local runs and tests.
///
/// Every insert stamps the secret with a fresh resource version so that
/// replacements always compare as newer.
#[derive(Debug, Default)]
pub struct InMemorySecretSource {
    inner: RwLock<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    secrets: HashMap<ObjectKey, Secret>,
    last_version: u64,
}

impl InMemorySecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a secret, returning the resource version assigned.
    pub async fn insert(&self, mut secret: Secret) -> u64 {
        let mut state = self.inner.write().await;
        state.last_version = state.last_version.max(secret.version()) + 1;
        secret.metadata.resource_version = state.last_version.to_string();
        let key = secret.key();
        debug!(
            namespace = %key.namespace,
            secret = %key.name,
            version = state.last_version,
            "Stored secret in memory source"
        );
        state.secrets.insert(key, secret);
        state.last_version
    }

    pub async fn remove(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.inner.write().await.secrets.remove(&ObjectKey::new(namespace, name))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.secrets.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.secrets.is_empty()
    }
}

#[async_trait]
impl SecretSource for InMemorySecretSource {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.inner
            .read()
            .await
            .secrets
            .get(&ObjectKey::new(namespace, name))
            .cloned()
            .ok_or_else(|| SecretCacheError::not_found(namespace, name))
    }
}
