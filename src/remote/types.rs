//! Remote Store Types
//!
//! Items, key pairs, table identity, and the option structs shared by every
//! remote-store implementation.

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// One stored record: a JSON-shaped attribute map.
pub type Item = Map<String, Value>;

// == Item Key ==
/// Partition/sort key pair addressing one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemKey {
    /// Partition key value
    pub partition: Value,
    /// Optional sort key value
    pub sort: Option<Value>,
}

impl ItemKey {
    /// Key with a partition value only.
    pub fn new(partition: impl Into<Value>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    /// Key with partition and sort values.
    pub fn with_sort(partition: impl Into<Value>, sort: impl Into<Value>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }

    // == Cache Key ==
    /// Composite cache key for this item: the partition value alone, or
    /// `partition:sort`.
    ///
    /// The derivation is deterministic so the adapter and any manual cache
    /// key construction elsewhere agree: string values render bare (no
    /// quotes), every other scalar renders as its JSON text.
    pub fn cache_key(&self) -> String {
        match &self.sort {
            Some(sort) => format!(
                "{}:{}",
                key_fragment(&self.partition),
                key_fragment(sort)
            ),
            None => key_fragment(&self.partition),
        }
    }
}

// == Key Fragment ==
/// Renders one key value for composite-key derivation.
pub fn key_fragment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// == Table Schema ==
/// Identity of one remote table/collection: its name and key attributes.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table/collection name
    pub table: String,
    /// Partition key attribute name
    pub partition_key: String,
    /// Sort key attribute name, if the table has one
    pub sort_key: Option<String>,
}

impl TableSchema {
    /// Schema for a table keyed by partition value only.
    pub fn new(table: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Schema for a table keyed by partition and sort values.
    pub fn with_sort_key(
        table: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
        }
    }

    // == Key Of ==
    /// Extracts the key pair from an item's own attributes, or `None` when
    /// a key attribute is absent.
    pub fn key_of(&self, item: &Item) -> Option<ItemKey> {
        let partition = item.get(&self.partition_key)?.clone();
        let sort = match &self.sort_key {
            Some(attr) => Some(item.get(attr)?.clone()),
            None => None,
        };
        Some(ItemKey { partition, sort })
    }

    /// Like [`key_of`](Self::key_of), but reports which attribute is absent.
    pub fn require_key_of(&self, item: &Item) -> Result<ItemKey> {
        let partition = item
            .get(&self.partition_key)
            .cloned()
            .ok_or_else(|| StoreError::MissingKeyAttribute {
                table: self.table.clone(),
                attribute: self.partition_key.clone(),
            })?;
        let sort = match &self.sort_key {
            Some(attr) => {
                Some(item.get(attr).cloned().ok_or_else(|| {
                    StoreError::MissingKeyAttribute {
                        table: self.table.clone(),
                        attribute: attr.clone(),
                    }
                })?)
            }
            None => None,
        };
        Ok(ItemKey { partition, sort })
    }

    /// True if `attribute` is this table's partition or sort key attribute.
    pub fn is_key_attribute(&self, attribute: &str) -> bool {
        attribute == self.partition_key
            || self.sort_key.as_deref() == Some(attribute)
    }
}

// == Query Options ==
/// Options for `query`.
///
/// A query carrying an index name or a filter expression is "complex": the
/// adapter bypasses the cache for such queries in both directions (no cache
/// read, no populate).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Secondary index to query instead of the primary key
    pub index_name: Option<String>,
    /// Server-side filter expression, passed through verbatim
    pub filter_expression: Option<String>,
    /// Maximum number of items to return
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// True when nothing disqualifies this query from the cache-aside path.
    pub fn is_simple(&self) -> bool {
        self.index_name.is_none() && self.filter_expression.is_none()
    }
}

// == Update Options ==
/// Options for `update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Fail with `ConditionFailed` when the item does not already exist,
    /// instead of creating it (no silent upsert).
    pub require_exists: bool,
}
