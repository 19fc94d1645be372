//! Remote Store Contract
//!
//! The minimal async interface the cache-aside adapter fronts. Modeled on
//! a partition/sort keyed item service but bound to no particular backend:
//! anything that can satisfy these eight operations can sit behind the
//! adapter.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::remote::types::{Item, ItemKey, QueryOptions, UpdateOptions};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Point read. An absent item is `Ok(None)`, not an error.
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>>;

    /// Full-item write: creates the item or replaces it wholesale.
    async fn put(&self, item: Item) -> Result<()>;

    /// Partial write: merges `attributes` into the addressed item.
    async fn update(
        &self,
        key: &ItemKey,
        attributes: Item,
        options: Option<UpdateOptions>,
    ) -> Result<()>;

    /// Point delete. Deleting an absent item is not an error.
    async fn delete(&self, key: &ItemKey) -> Result<()>;

    /// All items sharing one partition value.
    async fn query(&self, partition: &Value, options: Option<QueryOptions>) -> Result<Vec<Item>>;

    /// Batched point reads. Absent keys are simply missing from the result;
    /// found items come back in request order.
    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>>;

    /// Batched full-item writes.
    async fn batch_put(&self, items: Vec<Item>) -> Result<()>;

    /// Batched point deletes.
    async fn batch_delete(&self, keys: &[ItemKey]) -> Result<()>;
}
