//! In-Memory Remote Store
//!
//! HashMap-backed reference backend for tests and local development. It
//! records per-operation call counts and the key set of the last batch
//! fetch, so adapter behavior (which calls actually reached the store) can
//! be asserted from the outside, and it can be flipped "offline" to
//! exercise failure paths.
//!
//! A hash map has no secondary indexes: `index_name` and
//! `filter_expression` are accepted and ignored, and queries always scan
//! the primary partition attribute.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::remote::store::RemoteStore;
use crate::remote::types::{key_fragment, Item, ItemKey, QueryOptions, TableSchema, UpdateOptions};

// == Call Counts ==
/// Snapshot of how many calls each operation has served since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get: usize,
    pub put: usize,
    pub update: usize,
    pub delete: usize,
    pub query: usize,
    pub batch_get: usize,
    pub batch_put: usize,
    pub batch_delete: usize,
}

#[derive(Debug, Default)]
struct CallCounters {
    get: AtomicUsize,
    put: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    query: AtomicUsize,
    batch_get: AtomicUsize,
    batch_put: AtomicUsize,
    batch_delete: AtomicUsize,
}

// == Memory Store ==
pub struct MemoryStore {
    schema: TableSchema,
    items: RwLock<HashMap<String, Item>>,
    counters: CallCounters,
    last_batch_get: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store for the given table schema.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            items: RwLock::new(HashMap::new()),
            counters: CallCounters::default(),
            last_batch_get: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// The schema this store validates writes against.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Preloads items without touching the call counters.
    pub async fn seed(&self, items: Vec<Item>) -> Result<()> {
        let mut map = self.items.write().await;
        for item in items {
            let key = self.schema.require_key_of(&item)?;
            map.insert(key.cache_key(), item);
        }
        Ok(())
    }

    /// Number of items currently stored.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// True when the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Simulates the backend being unreachable: while offline, every
    /// operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Per-operation call counts. Calls are counted even when they fail.
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            get: self.counters.get.load(Ordering::SeqCst),
            put: self.counters.put.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
            query: self.counters.query.load(Ordering::SeqCst),
            batch_get: self.counters.batch_get.load(Ordering::SeqCst),
            batch_put: self.counters.batch_put.load(Ordering::SeqCst),
            batch_delete: self.counters.batch_delete.load(Ordering::SeqCst),
        }
    }

    /// Cache keys requested by the most recent `batch_get` call.
    pub fn last_batch_get_keys(&self) -> Vec<String> {
        self.last_batch_get
            .lock()
            .expect("batch key log lock poisoned")
            .clone()
    }

    fn guard_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!(
                "memory store for table '{}' is offline",
                self.schema.table
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        Ok(self.items.read().await.get(&key.cache_key()).cloned())
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.counters.put.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        let key = self.schema.require_key_of(&item)?;
        self.items.write().await.insert(key.cache_key(), item);
        Ok(())
    }

    async fn update(
        &self,
        key: &ItemKey,
        attributes: Item,
        options: Option<UpdateOptions>,
    ) -> Result<()> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        let cache_key = key.cache_key();
        let mut map = self.items.write().await;
        match map.get_mut(&cache_key) {
            Some(existing) => {
                for (attr, value) in attributes {
                    // Key attributes are not updatable
                    if self.schema.is_key_attribute(&attr) {
                        continue;
                    }
                    existing.insert(attr, value);
                }
                Ok(())
            }
            None => {
                if options.unwrap_or_default().require_exists {
                    return Err(StoreError::ConditionFailed(format!(
                        "item '{cache_key}' does not exist in table '{}'",
                        self.schema.table
                    )));
                }
                // Upsert: materialize the item from the key plus attributes
                let mut item = Item::new();
                item.insert(self.schema.partition_key.clone(), key.partition.clone());
                if let (Some(attr), Some(sort)) = (&self.schema.sort_key, &key.sort) {
                    item.insert(attr.clone(), sort.clone());
                }
                for (attr, value) in attributes {
                    if self.schema.is_key_attribute(&attr) {
                        continue;
                    }
                    item.insert(attr, value);
                }
                map.insert(cache_key, item);
                Ok(())
            }
        }
    }

    async fn delete(&self, key: &ItemKey) -> Result<()> {
        self.counters.delete.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        self.items.write().await.remove(&key.cache_key());
        Ok(())
    }

    async fn query(&self, partition: &Value, options: Option<QueryOptions>) -> Result<Vec<Item>> {
        self.counters.query.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        let options = options.unwrap_or_default();
        let map = self.items.read().await;
        let mut results: Vec<Item> = map
            .values()
            .filter(|item| item.get(&self.schema.partition_key) == Some(partition))
            .cloned()
            .collect();

        if let Some(attr) = &self.schema.sort_key {
            results.sort_by_key(|item| item.get(attr).map(key_fragment));
        }
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>> {
        self.counters.batch_get.fetch_add(1, Ordering::SeqCst);
        *self
            .last_batch_get
            .lock()
            .expect("batch key log lock poisoned") =
            keys.iter().map(ItemKey::cache_key).collect();
        self.guard_online()?;

        let map = self.items.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| map.get(&key.cache_key()).cloned())
            .collect())
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        self.counters.batch_put.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        // Validate every key before writing anything
        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            let key = self.schema.require_key_of(&item)?;
            keyed.push((key.cache_key(), item));
        }
        let mut map = self.items.write().await;
        for (cache_key, item) in keyed {
            map.insert(cache_key, item);
        }
        Ok(())
    }

    async fn batch_delete(&self, keys: &[ItemKey]) -> Result<()> {
        self.counters.batch_delete.fetch_add(1, Ordering::SeqCst);
        self.guard_online()?;

        let mut map = self.items.write().await;
        for key in keys {
            map.remove(&key.cache_key());
        }
        Ok(())
    }
}
