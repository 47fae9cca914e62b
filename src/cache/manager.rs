//! Cache Manager Module
//!
//! Read-through access over the shared [`CacheStore`]: typed get/set,
//! `get_or_set` with optional concurrent-miss collapse, batch helpers and
//! write-through.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore, CacheTag, Lookup};
use crate::config::Config;

// == Stale Policy ==
/// What `get_or_set_with` does when the producer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Propagate the producer error
    #[default]
    Fail,
    /// Return the expired value found during the freshness check, if any
    ServeStale,
}

// == Read Options ==
/// Per-call options for a read-through lookup.
#[derive(Debug, Clone, Default)]
pub struct ReadThrough {
    pub ttl: Option<u64>,
    pub policy: StalePolicy,
    pub tags: Vec<CacheTag>,
}

impl ReadThrough {
    pub fn ttl(ttl_seconds: u64) -> Self {
        Self {
            ttl: Some(ttl_seconds),
            ..Self::default()
        }
    }

    pub fn serve_stale(mut self) -> Self {
        self.policy = StalePolicy::ServeStale;
        self
    }

    pub fn tagged(mut self, tags: Vec<CacheTag>) -> Self {
        self.tags = tags;
        self
    }
}

// == Manager Settings ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    /// When false every read goes straight to the producer
    pub enabled: bool,
    /// Concurrent misses on one key wait for a single producer call
    pub collapse_concurrent: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            collapse_concurrent: true,
        }
    }
}

type Gate = Arc<AsyncMutex<()>>;

enum Cached<T> {
    Fresh(T),
    /// Expired value plus the store generation it was taken at
    Stale(Value, u64),
    Missing,
}

// == In-Flight Guard ==
/// Holds the per-key gate while a producer runs. Dropping it, including on
/// cancellation, lets the next waiter in.
struct InFlight<'a> {
    map: &'a Mutex<HashMap<String, Gate>>,
    key: String,
    gate: Gate,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.permit.take();

        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // Map slot plus ours; anything more is a caller still waiting.
        let unused = Arc::strong_count(&self.gate) <= 2;
        if unused && map.get(&self.key).is_some_and(|g| Arc::ptr_eq(g, &self.gate)) {
            map.remove(&self.key);
        }
    }
}

// == Cache Manager ==
/// Shared cache instance handed to data-access services.
#[derive(Debug)]
pub struct CacheManager {
    store: Arc<RwLock<CacheStore>>,
    in_flight: Mutex<HashMap<String, Gate>>,
    settings: ManagerSettings,
}

impl CacheManager {
    // == Constructors ==
    pub fn new(default_ttl: u64, settings: ManagerSettings) -> Self {
        Self::with_store(CacheStore::new(default_ttl), settings)
    }

    pub fn with_store(store: CacheStore, settings: ManagerSettings) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            in_flight: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.default_ttl,
            ManagerSettings {
                enabled: config.cache_enabled,
                collapse_concurrent: config.collapse_concurrent,
            },
        )
    }

    /// Shared handle to the underlying store, used by the cleanup task.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        self.store.clone()
    }

    pub fn settings(&self) -> ManagerSettings {
        self.settings
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or runs `producer`, caches its
    /// result for `ttl_seconds` and returns it.
    ///
    /// Producer errors are returned unchanged and nothing is cached.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl_seconds: u64,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_set_with(key, producer, ReadThrough::ttl(ttl_seconds))
            .await
    }

    /// `get_or_set` with explicit TTL, tags and stale-on-error policy.
    pub async fn get_or_set_with<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: ReadThrough,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.settings.enabled {
            return producer().await;
        }

        let mut stale = match self.lookup::<T>(key).await {
            Cached::Fresh(value) => {
                self.store.write().await.record_hit();
                debug!("Cache hit: {}", key);
                return Ok(value);
            }
            Cached::Stale(value, generation) => Some((value, generation)),
            Cached::Missing => None,
        };

        let _in_flight = if self.settings.collapse_concurrent {
            let guard = self.enter(key).await;
            // While we waited another caller either filled the key or failed
            // and put its stale copy back.
            match self.lookup::<T>(key).await {
                Cached::Fresh(value) => {
                    self.store.write().await.record_hit();
                    debug!("Cache hit after in-flight wait: {}", key);
                    return Ok(value);
                }
                Cached::Stale(value, generation) => stale = Some((value, generation)),
                Cached::Missing => {}
            }
            Some(guard)
        } else {
            None
        };

        self.store.write().await.record_miss();
        debug!("Cache miss: {}", key);

        match producer().await {
            Ok(value) => {
                self.put(key, &value, options.ttl, options.tags).await;
                Ok(value)
            }
            Err(err) => {
                let Some((value, generation)) = stale else {
                    return Err(err);
                };
                let served = match options.policy {
                    StalePolicy::ServeStale => serde_json::from_value::<T>(value.clone()).ok(),
                    StalePolicy::Fail => None,
                };
                // Keep the expired copy for the next caller during the outage.
                self.store
                    .write()
                    .await
                    .restore_stale(key, value, options.tags, generation);

                match served {
                    Some(value) => {
                        warn!("Serving stale value for {} after source error", key);
                        Ok(value)
                    }
                    None => Err(err),
                }
            }
        }
    }

    // == Get ==
    /// Returns a fresh value decoded as `T`, recording a hit or miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut store = self.store.write().await;
        let value = store.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!("Dropping undecodable cache entry {}: {}", key, err);
                store.record_error();
                store.delete(key);
                None
            }
        }
    }

    /// The raw entry behind `key`, recording a hit or miss like `get`.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        let mut store = self.store.write().await;
        store.get(key)?;
        store.entry(key).cloned()
    }

    // == Set ==
    /// Stores `value` under `key`. Encoding failures are logged and counted.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<u64>) {
        self.put(key, value, ttl, Vec::new()).await;
    }

    pub async fn set_tagged<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        tags: Vec<CacheTag>,
    ) {
        self.put(key, value, ttl, tags).await;
    }

    // == Batch ==
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[&str]) -> Vec<Option<T>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await);
        }
        values
    }

    pub async fn set_many<T, I>(&self, entries: I)
    where
        T: Serialize,
        I: IntoIterator<Item = (String, T, Option<u64>)>,
    {
        for (key, value, ttl) in entries {
            self.put(&key, &value, ttl, Vec::new()).await;
        }
    }

    // == Write Through ==
    /// Persists `value`, then caches what the persist step returned.
    ///
    /// Nothing is cached when persisting fails.
    pub async fn write_through<T, E, F, Fut>(
        &self,
        key: &str,
        value: T,
        persist: F,
        ttl_seconds: u64,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let stored = persist(value).await?;
        self.put(key, &stored, Some(ttl_seconds), Vec::new()).await;
        Ok(stored)
    }

    // == Removal ==
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    /// Removes every entry whose key matches `pattern` (prefix, or glob when
    /// it contains `*`).
    pub async fn invalidate(&self, pattern: &str) {
        let removed = self.store.write().await.invalidate(pattern);
        if removed > 0 {
            info!("Invalidated {} cache entries matching '{}'", removed, pattern);
        } else {
            debug!("No cache entries matched '{}'", pattern);
        }
    }

    pub async fn invalidate_tag(&self, tag: &CacheTag) {
        let removed = self.store.write().await.invalidate_tag(tag);
        if removed > 0 {
            info!("Invalidated {} cache entries tagged '{}'", removed, tag);
        }
    }

    /// Removes everything and resets counters.
    pub async fn clear(&self) {
        self.store.write().await.clear();
        info!("Cache cleared");
    }

    // == Introspection ==
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.store.read().await.keys(pattern)
    }

    // == Internals ==
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Cached<T> {
        let mut store = self.store.write().await;
        match store.lookup(key) {
            Lookup::Fresh(value) => match serde_json::from_value(value) {
                Ok(decoded) => Cached::Fresh(decoded),
                Err(err) => {
                    warn!("Dropping undecodable cache entry {}: {}", key, err);
                    store.record_error();
                    store.delete(key);
                    Cached::Missing
                }
            },
            Lookup::Stale(value) => Cached::Stale(value, store.generation()),
            Lookup::Missing => Cached::Missing,
        }
    }

    async fn put<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        tags: Vec<CacheTag>,
    ) {
        match serde_json::to_value(value) {
            Ok(encoded) => {
                self.store.write().await.set_tagged(key, encoded, ttl, tags);
            }
            Err(err) => {
                warn!("Not caching {}: {}", key, err);
                self.store.write().await.record_error();
            }
        }
    }

    async fn enter(&self, key: &str) -> InFlight<'_> {
        let gate = {
            let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.to_string()).or_default().clone()
        };
        // Built before waiting so a cancelled waiter still releases its slot.
        let mut guard = InFlight {
            map: &self.in_flight,
            key: key.to_string(),
            gate: gate.clone(),
            permit: None,
        };
        guard.permit = Some(gate.lock_owned().await);
        guard
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
