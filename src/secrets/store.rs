//! Reference-counted, TTL-bounded secret store.
//!
//! The store keeps one item per registered key. An item lives exactly as long
//! as at least one pod references the key, and owns an optional snapshot with
//! the last resolved result for that key.
//!
//! # Locking
//!
//! Two lock scopes are used:
//!
//! - the structural lock guards the key map and reference counts. It is held
//!   only to look up, create or drop items and is never held across a fetch.
//! - each snapshot has its own async mutex, held across the fetch for that
//!   key. Readers of different keys never wait on each other; readers of the
//!   same key queue on the snapshot so at most one fetch per key is in flight.
//!
//! # Staleness
//!
//! A snapshot is refreshed once its TTL has elapsed. A fetched secret older
//! than the cached one is discarded, but the refresh time still moves
//! forward so a losing fetch cannot cause a refetch storm. Transient errors
//! are never cached: a cold key returns the error and retries on the next
//! read, a warm key keeps serving its previous result until the next TTL.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn, Instrument};

use super::clock::Clock;
use super::source::SecretSource;
use crate::domain::{ObjectKey, Secret};
use crate::errors::{Result, SecretCacheError};
use crate::observability::{FetchOutcome, MetricsRecorder};

type SharedSnapshot = Arc<tokio::sync::Mutex<Snapshot>>;

/// Last resolved state of one key.
#[derive(Debug, Default)]
struct Snapshot {
    secret: Option<Arc<Secret>>,
    error: Option<SecretCacheError>,
    last_update: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// No fetch has completed into this snapshot yet.
    fn is_empty(&self) -> bool {
        self.secret.is_none() && self.error.is_none()
    }

    fn needs_refresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.error.as_ref().is_some_and(|err| !err.is_not_found()) {
            return true;
        }
        match self.last_update {
            None => true,
            // A clock that went backwards keeps the snapshot fresh.
            Some(updated) => {
                now.signed_duration_since(updated).to_std().is_ok_and(|age| age >= ttl)
            }
        }
    }

    /// Store a fetch result unless it would regress to an older version.
    /// Returns whether the stored result changed.
    fn apply(&mut self, fetched: Result<Secret>) -> bool {
        let replace = match (&self.secret, &fetched) {
            (Some(current), Ok(secret)) => !secret.is_older_than(current),
            _ => true,
        };
        if replace {
            match fetched {
                Ok(secret) => {
                    self.secret = Some(Arc::new(secret));
                    self.error = None;
                }
                Err(err) => {
                    self.secret = None;
                    self.error = Some(err);
                }
            }
        }
        replace
    }

    fn result(&self) -> Result<Arc<Secret>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.secret
            .clone()
            .ok_or_else(|| SecretCacheError::internal("snapshot read before any fetch completed"))
    }
}

#[derive(Debug)]
struct CacheItem {
    ref_count: usize,
    /// `None` forces the next read to fetch.
    snapshot: Option<SharedSnapshot>,
}

/// Local cache of the secrets referenced by registered pods.
#[derive(Debug)]
pub struct CacheStore {
    source: Arc<dyn SecretSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    items: Mutex<HashMap<ObjectKey, CacheItem>>,
    metrics: MetricsRecorder,
}

impl CacheStore {
    pub fn new(source: Arc<dyn SecretSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            items: Mutex::new(HashMap::new()),
            metrics: MetricsRecorder::new(),
        }
    }

    fn lock_items(&self) -> MutexGuard<'_, HashMap<ObjectKey, CacheItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a reference on `key` and invalidate its cached state.
    ///
    /// Called on the registration path, so it never fetches.
    pub fn add(&self, key: &ObjectKey) {
        let mut items = self.lock_items();
        let item = items
            .entry(key.clone())
            .or_insert_with(|| CacheItem { ref_count: 0, snapshot: None });
        item.ref_count += 1;
        item.snapshot = None;
        debug!(
            namespace = %key.namespace,
            secret = %key.name,
            ref_count = item.ref_count,
            "Added secret reference"
        );
        self.metrics.set_cached_items(items.len());
    }

    /// Drop the cached state of `key` without touching its reference count.
    pub fn invalidate(&self, key: &ObjectKey) {
        if let Some(item) = self.lock_items().get_mut(key) {
            item.snapshot = None;
        }
    }

    /// Release a reference on `key`, evicting it when none remain.
    pub fn delete(&self, key: &ObjectKey) {
        let mut items = self.lock_items();
        let Some(item) = items.get_mut(key) else {
            debug!(
                namespace = %key.namespace,
                secret = %key.name,
                "Ignoring release of unreferenced secret"
            );
            return;
        };

        item.ref_count = item.ref_count.saturating_sub(1);
        if item.ref_count == 0 {
            items.remove(key);
            self.metrics.record_eviction();
            debug!(namespace = %key.namespace, secret = %key.name, "Evicted secret");
        } else {
            debug!(
                namespace = %key.namespace,
                secret = %key.name,
                ref_count = item.ref_count,
                "Released secret reference"
            );
        }
        self.metrics.set_cached_items(items.len());
    }

    /// Read `key`, fetching from the source when the cached state is missing
    /// or stale.
    ///
    /// # Errors
    ///
    /// - [`SecretCacheError::NotRegistered`] if no pod references the key
    /// - [`SecretCacheError::NotFound`] if the source reported the secret missing
    /// - the source's error when a key that never resolved fails to fetch
    pub async fn get(&self, key: &ObjectKey) -> Result<Arc<Secret>> {
        let snapshot = {
            let mut items = self.lock_items();
            let item = items
                .get_mut(key)
                .ok_or_else(|| SecretCacheError::not_registered(&key.namespace, &key.name))?;
            Arc::clone(item.snapshot.get_or_insert_with(SharedSnapshot::default))
        };

        let mut data = snapshot.lock().await;
        if !data.needs_refresh(self.clock.now(), self.ttl) {
            self.metrics.record_hit();
            return data.result();
        }

        let started = Instant::now();
        let fetched = self
            .source
            .fetch(&key.namespace, &key.name)
            .instrument(crate::cache_span!("fetch", key.namespace, key.name))
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        match fetched {
            Ok(_) | Err(SecretCacheError::NotFound { .. }) => {
                let outcome =
                    if fetched.is_ok() { FetchOutcome::Success } else { FetchOutcome::NotFound };
                self.metrics.record_fetch(outcome, elapsed);

                let fetched_version = fetched.as_ref().map(|s| s.version()).ok();
                if !data.apply(fetched) {
                    self.metrics.record_version_skew();
                    warn!(
                        namespace = %key.namespace,
                        secret = %key.name,
                        fetched_version = ?fetched_version,
                        cached_version = ?data.secret.as_ref().map(|s| s.version()),
                        "Discarded secret older than cached version"
                    );
                }
                data.last_update = Some(self.clock.now());
            }
            Err(err) => {
                self.metrics.record_fetch(FetchOutcome::Error, elapsed);
                if data.is_empty() {
                    debug!(
                        namespace = %key.namespace,
                        secret = %key.name,
                        error = %err,
                        "Fetch failed for uninitialized secret"
                    );
                    return Err(err);
                }
                self.metrics.record_stale_served();
                warn!(
                    namespace = %key.namespace,
                    secret = %key.name,
                    error = %err,
                    "Fetch failed, serving previous result"
                );
                data.last_update = Some(self.clock.now());
            }
        }

        data.result()
    }

    /// Current reference count of `key`, 0 when absent.
    pub fn ref_count(&self, key: &ObjectKey) -> usize {
        self.lock_items().get(key).map_or(0, |item| item.ref_count)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.lock_items().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }
}
