//! Sidecache - An in-memory TTL cache with a cache-aside store adapter
//!
//! Provides named cache instances with lazy expiration and an adapter that
//! wraps any remote key-value store with read-through/invalidate-on-write
//! caching.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod remote;

pub use adapter::CachedTable;
pub use cache::{CacheRegistry, CacheStats, InstanceOptions, LocalCache};
pub use config::CacheConfig;
pub use error::{Result, StoreError};
pub use remote::{Item, ItemKey, MemoryStore, QueryOptions, RemoteStore, TableSchema, UpdateOptions};
