//! Common test utilities for all integration tests.
//!
//! Provides a scripted secret source with call counting and an optional
//! gate that holds fetches until the test releases them.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use secret_cache::domain::{Pod, Secret};
use secret_cache::secrets::{CachingSecretManager, FakeClock, SecretSource};
use secret_cache::{Result, SecretCacheError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub const TTL: Duration = Duration::from_secs(60);

/// Source answering from per-key queues of scripted results.
///
/// When a key's queue is drained the last result for that key is repeated;
/// a key that was never scripted is reported as not found.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    queues: Mutex<HashMap<(String, String), VecDeque<Result<Secret>>>>,
    last: Mutex<HashMap<(String, String), Result<Secret>>>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, namespace: &str, name: &str, response: Result<Secret>) {
        self.queues
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn push_secret(&self, namespace: &str, name: &str, version: u64) {
        self.push(namespace, name, Ok(secret(namespace, name, version)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following fetch wait for a permit from the returned gate.
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl SecretSource for ScriptedSource {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let key = (namespace.to_string(), name.to_string());
        let next = self.queues.lock().unwrap().get_mut(&key).and_then(|q| q.pop_front());
        let mut last = self.last.lock().unwrap();
        if let Some(response) = next {
            last.insert(key.clone(), response);
        }
        last.get(&key).cloned().unwrap_or_else(|| Err(SecretCacheError::not_found(namespace, name)))
    }
}

pub fn secret(namespace: &str, name: &str, version: u64) -> Secret {
    Secret::new(namespace, name, version).with_data("value", format!("{}-v{}", name, version))
}

pub fn caching_manager(source: Arc<ScriptedSource>) -> (Arc<CachingSecretManager>, FakeClock) {
    let clock = FakeClock::default();
    let manager = CachingSecretManager::new(source, Arc::new(clock.clone()), TTL);
    (Arc::new(manager), clock)
}

/// Pod in `ns` referencing each of `secrets` through an image pull secret.
pub fn pod(name: &str, secrets: &[&str]) -> Pod {
    secrets.iter().fold(Pod::new("ns", name), |pod, secret| pod.with_image_pull_secret(*secret))
}

pub fn value_of(secret: &Secret) -> String {
    secret.get("value").and_then(|v| v.expose_str()).unwrap_or_default().to_string()
}
