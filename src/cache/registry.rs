//! Cache Registry Module
//!
//! Named cache instances and the shared handles that reach them.
//!
//! The registry is an explicit object constructed once at process start and
//! passed (or `Arc`-shared) to every component that wants a named cache,
//! rather than ambient static state. One instance exists per name for the
//! registry's lifetime; instances are never destroyed short of process exit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::store::{CacheWrite, InstanceOptions, TtlStore};
use crate::cache::{CacheStats, DEFAULT_INSTANCE};

// == Cache Registry ==
/// Process-wide set of named cache instances (singleton-per-name).
#[derive(Debug, Default)]
pub struct CacheRegistry {
    /// name → live handle. The lock guards only map lookup/insert and is
    /// never held across an await.
    instances: Mutex<HashMap<String, LocalCache>>,
}

impl CacheRegistry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // == Instance ==
    /// Returns the instance registered under `name`, creating it with
    /// `options` on first use.
    ///
    /// Options are honored only on first construction for a given name;
    /// later calls with different options for the same name are silently
    /// ignored. This is documented behavior, not an accident: the first
    /// registration wins.
    pub fn instance(&self, name: &str, options: InstanceOptions) -> LocalCache {
        let mut instances = self
            .instances
            .lock()
            .expect("cache registry lock poisoned");

        if let Some(handle) = instances.get(name) {
            return handle.clone();
        }

        debug!(cache = name, "creating cache instance");
        let handle = LocalCache::new(name, options);
        instances.insert(name.to_string(), handle.clone());
        handle
    }

    // == Default Instance ==
    /// The reserved shared instance (name `"default"`, default options).
    pub fn default_instance(&self) -> LocalCache {
        self.instance(DEFAULT_INSTANCE, InstanceOptions::default())
    }

    // == Instance Names ==
    /// Names of all live instances, arbitrary order.
    pub fn instance_names(&self) -> Vec<String> {
        self.instances
            .lock()
            .expect("cache registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

// == Local Cache Handle ==
/// Cheap clonable handle to one named cache instance.
///
/// All clones (and all registry lookups of the same name) share the same
/// underlying store: mutations through one handle are visible through every
/// other. Methods are async because each briefly acquires the instance
/// lock; none of them perform I/O or suspend for anything else.
#[derive(Debug, Clone)]
pub struct LocalCache {
    /// Instance name, duplicated here so it is readable without locking
    name: Arc<str>,
    inner: Arc<RwLock<TtlStore>>,
}

impl LocalCache {
    fn new(name: &str, options: InstanceOptions) -> Self {
        Self {
            name: Arc::from(name),
            inner: Arc::new(RwLock::new(TtlStore::new(name, options))),
        }
    }

    /// Name this instance is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retrieves a value, `None` on absent or expired keys.
    ///
    /// Write access is needed even for reads: lookups update hit/miss
    /// counters, evict expired entries, and may run the lazy sweep.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.write().await.get(key)
    }

    /// Stores a value with an optional TTL in seconds. A falsy value
    /// deletes the key instead of storing it (see
    /// [`TtlStore::set`](crate::cache::TtlStore::set)).
    pub async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) {
        self.inner.write().await.set(key, value, ttl_seconds)
    }

    /// Applies `set` per record, with no atomicity across records.
    pub async fn set_many(&self, writes: Vec<CacheWrite>) {
        self.inner.write().await.set_many(writes)
    }

    /// Per-key `get`, omitting misses.
    pub async fn get_many(&self, keys: &[String]) -> HashMap<String, Value> {
        self.inner.write().await.get_many(keys)
    }

    /// Values whose logical key starts with `prefix`, arbitrary order.
    pub async fn query(&self, prefix: &str) -> Vec<Value> {
        self.inner.write().await.query(prefix)
    }

    /// Removes the entry if present; returns whether anything was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.write().await.delete(key)
    }

    /// Equivalent to `get(key).await.is_some()`.
    pub async fn has(&self, key: &str) -> bool {
        self.inner.write().await.has(key)
    }

    /// Empties this instance only.
    pub async fn clear(&self) {
        self.inner.write().await.clear()
    }

    /// Resident entry count after the interval-gated sweep.
    pub async fn len(&self) -> usize {
        self.inner.write().await.len()
    }

    /// True if the instance holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.write().await.is_empty()
    }

    /// Logical keys of all resident entries.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.write().await.keys()
    }

    /// Values of all resident entries.
    pub async fn values(&self) -> Vec<Value> {
        self.inner.write().await.values()
    }

    /// (logical key, value) pairs of all resident entries.
    pub async fn entries(&self) -> Vec<(String, Value)> {
        self.inner.write().await.entries()
    }

    /// Snapshot of this instance's hit/miss/expiry counters.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    /// Forced sweep of expired entries, bypassing the interval gate.
    /// Returns the number removed.
    pub async fn cleanup_now(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }
}
