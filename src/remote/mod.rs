//! Remote Store Module
//!
//! The abstract keyed item store the adapter fronts, plus an in-memory
//! reference backend with call recording for tests and local development.

mod memory;
mod store;
mod types;

pub use memory::{CallCounts, MemoryStore};
pub use store::RemoteStore;
pub use types::{key_fragment, Item, ItemKey, QueryOptions, TableSchema, UpdateOptions};
