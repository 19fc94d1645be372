//! Cache Module
//!
//! Provides the in-memory TTL cache: named instances with optional
//! per-entry expiration and lazy, access-triggered cleanup. Entries live
//! until their TTL elapses or a caller removes them; there is no capacity
//! bound and no persistence — this is a volatile optimization layer, not a
//! store of record.

mod entry;
mod registry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{is_falsy, CacheEntry};
pub use registry::{CacheRegistry, LocalCache};
pub use stats::CacheStats;
pub use store::{CacheWrite, InstanceOptions, TtlStore};

// == Public Constants ==
/// Name of the reserved default cache instance
pub const DEFAULT_INSTANCE: &str = "default";

/// Default interval between lazy-cleanup sweeps (30 minutes)
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 30 * 60 * 1000;
