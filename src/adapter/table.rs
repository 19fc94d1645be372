//! Cached Table Adapter
//!
//! Wraps a [`RemoteStore`] with cache-aside behavior: reads populate the
//! cache, writes refresh or invalidate it, and every operation falls back
//! to plain store delegation when caching is disabled.
//!
//! This is a best-effort optimization layer, not a coherence protocol. It
//! assumes this adapter (or adapters sharing its cache instance) is the
//! only writer path; writers that bypass it leave stale cache entries
//! until TTL expiry or a later update/delete through the adapter. The
//! remote store stays authoritative at all times.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheRegistry, CacheStats, CacheWrite, InstanceOptions, LocalCache};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::remote::{
    key_fragment, Item, ItemKey, QueryOptions, RemoteStore, TableSchema, UpdateOptions,
};

// == Cached Table ==
/// Cache-aside front for one remote table.
pub struct CachedTable<S: RemoteStore> {
    store: S,
    schema: TableSchema,
    cache: LocalCache,
    enabled: AtomicBool,
    ttl_seconds: Option<u64>,
}

impl<S: RemoteStore> CachedTable<S> {
    /// Creates an adapter for `store`, resolving its cache instance through
    /// `registry`.
    ///
    /// The instance name and key prefix both default to the table name when
    /// the config leaves them unset. Instance-level options (cleanup
    /// interval, logging, prefix) only take effect if this call is the
    /// first to register the instance name.
    pub fn new(store: S, schema: TableSchema, registry: &CacheRegistry, config: CacheConfig) -> Self {
        let instance_name = config
            .instance_name
            .unwrap_or_else(|| schema.table.clone());
        let key_prefix = config.prefix.unwrap_or_else(|| schema.table.clone());
        let cache = registry.instance(
            &instance_name,
            InstanceOptions {
                cleanup_interval_ms: config.cleanup_interval_ms,
                enable_logging: config.enable_logging,
                key_prefix,
            },
        );
        debug!(
            table = %schema.table,
            instance = %instance_name,
            enabled = config.enabled,
            ttl_seconds = ?config.ttl_seconds,
            "cached table adapter created"
        );
        Self {
            store,
            schema,
            cache,
            enabled: AtomicBool::new(config.enabled),
            ttl_seconds: config.ttl_seconds,
        }
    }

    /// The wrapped remote store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The table schema this adapter derives cache keys from.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    // == Reads ==

    /// Point read with read-through population.
    ///
    /// A cache hit returns without touching the remote store. A miss
    /// fetches from the store and, when the item exists, caches it with the
    /// configured TTL. Absent items are never cached (no negative caching),
    /// so every miss re-queries the store.
    pub async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        if !self.is_cache_enabled() {
            return self.store.get(key).await;
        }

        let cache_key = key.cache_key();
        if let Some(Value::Object(item)) = self.cache.get(&cache_key).await {
            debug!(key = %cache_key, "serving item from cache");
            return Ok(Some(item));
        }

        match self.store.get(key).await? {
            Some(item) => {
                self.cache
                    .set(&cache_key, Value::Object(item.clone()), self.ttl_seconds)
                    .await;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Query by partition value.
    ///
    /// Cache-aside applies only to simple queries (no index name, no filter
    /// expression): a non-empty cache prefix match on the rendered
    /// partition value is served directly, capped to `limit`; otherwise the
    /// store is queried and each returned item is cached under its own
    /// derived key. Complex queries bypass the cache in both directions.
    pub async fn query(&self, partition: &Value, options: Option<QueryOptions>) -> Result<Vec<Item>> {
        let options = options.unwrap_or_default();
        let simple = options.is_simple();
        let use_cache = self.is_cache_enabled() && simple;

        if use_cache {
            let prefix = key_fragment(partition);
            let mut items: Vec<Item> = self
                .cache
                .query(&prefix)
                .await
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(item) => Some(item),
                    _ => None,
                })
                .collect();
            if !items.is_empty() {
                if let Some(limit) = options.limit {
                    items.truncate(limit);
                }
                debug!(prefix = %prefix, count = items.len(), "serving query from cache");
                return Ok(items);
            }
        }

        let items = self.store.query(partition, Some(options)).await?;
        if use_cache {
            self.populate(&items).await;
        }
        Ok(items)
    }

    /// Batched point read.
    ///
    /// Requested keys are split into cache hits and misses; only the misses
    /// go to the remote store, in a single batch call (skipped entirely
    /// when every key hits). Fetched items are cached. The result is cache
    /// hits followed by fetched items — not the input key order — and
    /// callers must tolerate that ordering.
    pub async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>> {
        if !self.is_cache_enabled() {
            return self.store.batch_get(keys).await;
        }

        let mut hits: Vec<Item> = Vec::new();
        let mut missing: Vec<ItemKey> = Vec::new();
        for key in keys {
            match self.cache.get(&key.cache_key()).await {
                Some(Value::Object(item)) => hits.push(item),
                _ => missing.push(key.clone()),
            }
        }
        debug!(
            hits = hits.len(),
            misses = missing.len(),
            "batch get partitioned"
        );

        if missing.is_empty() {
            return Ok(hits);
        }

        let fetched = self.store.batch_get(&missing).await?;
        self.populate(&fetched).await;
        hits.extend(fetched);
        Ok(hits)
    }

    // == Writes ==

    /// Full-item write, remote store first.
    ///
    /// Only when the store write succeeds (and caching is enabled) is the
    /// cache entry overwritten with the new item — refresh-on-write rather
    /// than invalidate-then-reload.
    pub async fn put(&self, item: Item) -> Result<()> {
        let cache_entry = if self.is_cache_enabled() {
            self.schema
                .key_of(&item)
                .map(|key| (key.cache_key(), item.clone()))
        } else {
            None
        };

        self.store.put(item).await?;

        if let Some((cache_key, copy)) = cache_entry {
            self.cache
                .set(&cache_key, Value::Object(copy), self.ttl_seconds)
                .await;
        }
        Ok(())
    }

    /// Partial write.
    ///
    /// On success the cache entry is deleted, not refreshed: without
    /// re-reading, the adapter cannot know the post-update item shape, so
    /// invalidation is the conservative choice. A failed store write leaves
    /// the cache untouched.
    pub async fn update(
        &self,
        key: &ItemKey,
        attributes: Item,
        options: Option<UpdateOptions>,
    ) -> Result<()> {
        self.store.update(key, attributes, options).await?;
        if self.is_cache_enabled() {
            self.cache.delete(&key.cache_key()).await;
        }
        Ok(())
    }

    /// Point delete.
    ///
    /// The cache entry is evicted regardless of the remote outcome, errors
    /// included — a stale positive entry is worse than a wasted eviction,
    /// and both paths are idempotent.
    pub async fn delete(&self, key: &ItemKey) -> Result<()> {
        let result = self.store.delete(key).await;
        if self.is_cache_enabled() {
            self.cache.delete(&key.cache_key()).await;
        }
        result
    }

    /// Batched full-item write.
    ///
    /// The whole batch goes to the remote store; on success every item is
    /// cached. There is no partial-success handling — the batch is
    /// all-or-nothing from this adapter's perspective.
    pub async fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        let writes = if self.is_cache_enabled() {
            self.cache_writes(&items)
        } else {
            Vec::new()
        };

        self.store.batch_put(items).await?;

        if !writes.is_empty() {
            self.cache.set_many(writes).await;
        }
        Ok(())
    }

    /// Batched point delete. Every corresponding cache key is evicted
    /// regardless of the remote outcome.
    pub async fn batch_delete(&self, keys: &[ItemKey]) -> Result<()> {
        let result = self.store.batch_delete(keys).await;
        if self.is_cache_enabled() {
            for key in keys {
                self.cache.delete(&key.cache_key()).await;
            }
        }
        result
    }

    // == Cache Administration ==

    /// Drops every entry in the backing cache instance. Does not touch the
    /// remote store.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Entry count of the backing cache instance.
    pub async fn cache_size(&self) -> usize {
        self.cache.len().await
    }

    /// Statistics snapshot of the backing cache instance.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Runtime master switch for the cache-aside path.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(
            table = %self.schema.table,
            enabled,
            "cache toggled"
        );
    }

    /// Whether the cache-aside path is currently active.
    pub fn is_cache_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // == Internals ==

    /// Caches `items` under their derived keys; items missing a key
    /// attribute are skipped.
    async fn populate(&self, items: &[Item]) {
        let writes = self.cache_writes(items);
        if !writes.is_empty() {
            self.cache.set_many(writes).await;
        }
    }

    fn cache_writes(&self, items: &[Item]) -> Vec<CacheWrite> {
        items
            .iter()
            .filter_map(|item| {
                self.schema.key_of(item).map(|key| {
                    CacheWrite::new(
                        key.cache_key(),
                        Value::Object(item.clone()),
                        self.ttl_seconds,
                    )
                })
            })
            .collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use serde_json::json;

    fn user(id: &str, name: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), json!(id));
        item.insert("name".to_string(), json!(name));
        item
    }

    fn users_table(registry: &CacheRegistry, config: CacheConfig) -> CachedTable<MemoryStore> {
        let schema = TableSchema::new("users", "id");
        CachedTable::new(MemoryStore::new(schema.clone()), schema, registry, config)
    }

    #[tokio::test]
    async fn test_instance_and_prefix_default_to_table_name() {
        let registry = CacheRegistry::new();
        let table = users_table(&registry, CacheConfig::default());

        assert_eq!(registry.instance_names(), vec!["users".to_string()]);

        table.put(user("user-1", "Alice")).await.unwrap();
        // The shared instance stores the entry under the table-name prefix,
        // invisible through the handle
        let cache = registry.instance("users", InstanceOptions::default());
        assert_eq!(cache.keys().await, vec!["user-1".to_string()]);
    }

    #[tokio::test]
    async fn test_config_names_override_defaults() {
        let registry = CacheRegistry::new();
        let config = CacheConfig {
            instance_name: Some("shared".to_string()),
            prefix: Some("u.".to_string()),
            ..CacheConfig::default()
        };
        let table = users_table(&registry, config);

        table.put(user("user-1", "Alice")).await.unwrap();
        assert_eq!(registry.instance_names(), vec!["shared".to_string()]);

        let cache = registry.instance("shared", InstanceOptions::default());
        assert!(cache.has("user-1").await);
    }

    #[tokio::test]
    async fn test_get_serves_second_read_from_cache() {
        let registry = CacheRegistry::new();
        let table = users_table(&registry, CacheConfig::default());
        table.store().seed(vec![user("user-1", "Alice")]).await.unwrap();

        let key = ItemKey::new("user-1");
        let first = table.get(&key).await.unwrap().unwrap();
        let second = table.get(&key).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(table.store().calls().get, 1);
    }

    #[tokio::test]
    async fn test_disabled_adapter_always_delegates() {
        let registry = CacheRegistry::new();
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let table = users_table(&registry, config);
        table.store().seed(vec![user("user-1", "Alice")]).await.unwrap();

        let key = ItemKey::new("user-1");
        table.get(&key).await.unwrap();
        table.get(&key).await.unwrap();

        assert_eq!(table.store().calls().get, 2);
        assert_eq!(table.cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_toggle_reactivates_cache_path() {
        let registry = CacheRegistry::new();
        let table = users_table(&registry, CacheConfig::default());
        table.store().seed(vec![user("user-1", "Alice")]).await.unwrap();

        assert!(table.is_cache_enabled());
        table.set_cache_enabled(false);
        assert!(!table.is_cache_enabled());

        let key = ItemKey::new("user-1");
        table.get(&key).await.unwrap();
        assert_eq!(table.cache_size().await, 0);

        table.set_cache_enabled(true);
        table.get(&key).await.unwrap();
        assert_eq!(table.cache_size().await, 1);
    }
}
