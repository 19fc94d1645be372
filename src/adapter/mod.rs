//! Adapter Module
//!
//! The cache-aside layer that sits between callers and a remote store.

mod table;

pub use table::CachedTable;
