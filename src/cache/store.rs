//! Cache Store Module
//!
//! The synchronous per-instance cache engine: a prefixed key map with
//! optional per-entry TTL and lazy, access-triggered cleanup.
//!
//! Expired entries are not reaped by a background task. Every operation runs
//! an interval-gated sweep (default every 30 minutes of traffic), and `get`/
//! `query` additionally re-check the entries they touch, so an expired value
//! is never served even if the sweep has not caught it yet. The cost is that
//! an expired entry nobody touches can stay resident for up to one interval.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, is_falsy, CacheEntry};
use crate::cache::{CacheStats, DEFAULT_CLEANUP_INTERVAL_MS};

// == Instance Options ==
/// Construction parameters for one cache instance.
///
/// These are honored only when the instance is first created under its name;
/// the registry silently ignores options passed on later lookups of the same
/// name (documented behavior, not an accident).
#[derive(Debug, Clone)]
pub struct InstanceOptions {
    /// Milliseconds between lazy-cleanup sweeps
    pub cleanup_interval_ms: u64,
    /// Emit hit/miss/cleanup diagnostics for this instance
    pub enable_logging: bool,
    /// Prefix prepended to every physically stored key (possibly empty).
    /// Invisible to callers: enumeration strips it before returning.
    pub key_prefix: String,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            enable_logging: false,
            key_prefix: String::new(),
        }
    }
}

// == Cache Write ==
/// One record of a multi-entry `set_many` call.
#[derive(Debug, Clone)]
pub struct CacheWrite {
    /// Logical key (stored under the instance prefix)
    pub key: String,
    /// Payload to store; falsy payloads delete the key instead
    pub value: Value,
    /// Optional TTL in seconds
    pub ttl_seconds: Option<u64>,
}

impl CacheWrite {
    /// Creates a new CacheWrite.
    pub fn new(key: impl Into<String>, value: Value, ttl_seconds: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl_seconds,
        }
    }
}

// == TTL Store ==
/// The per-instance cache engine.
///
/// All methods are synchronous and touch only process memory; the shared
/// async-facing surface lives on [`LocalCache`](crate::cache::LocalCache),
/// which wraps this type in a lock.
#[derive(Debug)]
pub struct TtlStore {
    /// Instance name, carried for log context
    name: String,
    /// Key-value storage, keyed by the full (prefixed) key
    entries: HashMap<String, CacheEntry>,
    /// Prefix physically prepended to every stored key
    key_prefix: String,
    /// Milliseconds between lazy-cleanup sweeps
    cleanup_interval_ms: i64,
    /// When the last sweep ran (Unix milliseconds)
    last_cleanup_at: i64,
    /// Hit/miss/cleanup diagnostics toggle
    log_enabled: bool,
    /// Performance counters
    stats: CacheStats,
}

impl TtlStore {
    // == Constructor ==
    /// Creates a new store for the given instance name.
    pub fn new(name: impl Into<String>, options: InstanceOptions) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            key_prefix: options.key_prefix,
            cleanup_interval_ms: options.cleanup_interval_ms as i64,
            last_cleanup_at: current_timestamp_ms(),
            log_enabled: options.enable_logging,
            stats: CacheStats::new(),
        }
    }

    /// Instance name this store was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prefix carried by every physically stored key.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    // == Get ==
    /// Retrieves a value by logical key.
    ///
    /// Returns `None` for absent keys and for entries whose TTL has elapsed;
    /// an expired entry found here is evicted on the spot. Misses are never
    /// errors.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.maybe_cleanup();

        let full = self.full_key(key);
        if let Some(entry) = self.entries.get(&full) {
            if entry.is_expired() {
                self.entries.remove(&full);
                self.stats.record_expired(1);
                self.stats.record_miss();
                self.stats.set_entries(self.entries.len());
                if self.log_enabled {
                    debug!(cache = %self.name, key, "miss (expired on access)");
                }
                return None;
            }

            let value = entry.value.clone();
            let remaining = entry.ttl_remaining_ms();
            self.stats.record_hit();
            if self.log_enabled {
                debug!(cache = %self.name, key, ttl_remaining_ms = ?remaining, "hit");
            }
            Some(value)
        } else {
            self.stats.record_miss();
            if self.log_enabled {
                debug!(cache = %self.name, key, "miss");
            }
            None
        }
    }

    // == Set ==
    /// Stores a value under the logical key, overwriting any previous entry
    /// wholesale (no merge). `ttl_seconds` of `None` means the entry never
    /// expires.
    ///
    /// A falsy value (`null`, `false`, `""`, numeric `0`) is an implicit
    /// delete: the key is dropped rather than stored. See
    /// [`is_falsy`](crate::cache::is_falsy) for the escape hatch.
    pub fn set(&mut self, key: &str, value: Value, ttl_seconds: Option<u64>) {
        self.maybe_cleanup();

        let full = self.full_key(key);
        if is_falsy(&value) {
            if self.entries.remove(&full).is_some() {
                self.stats.set_entries(self.entries.len());
            }
            if self.log_enabled {
                debug!(cache = %self.name, key, "set with falsy value, entry dropped");
            }
            return;
        }

        self.entries.insert(full, CacheEntry::new(value, ttl_seconds));
        self.stats.set_entries(self.entries.len());
        if self.log_enabled {
            debug!(cache = %self.name, key, ttl_seconds = ?ttl_seconds, "set");
        }
    }

    // == Set Many ==
    /// Applies `set` per record. There is no atomicity across records; a
    /// reader interleaving with `set_many` can observe a partial batch.
    pub fn set_many(&mut self, writes: Vec<CacheWrite>) {
        for write in writes {
            self.set(&write.key, write.value, write.ttl_seconds);
        }
    }

    // == Get Many ==
    /// Per-key `get`, omitting misses from the returned map.
    pub fn get_many(&mut self, keys: &[String]) -> HashMap<String, Value> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(key) {
                found.insert(key.clone(), value);
            }
        }
        found
    }

    // == Query ==
    /// Full-scans the instance and returns the values whose full key starts
    /// with `key_prefix + prefix`. Expired entries under the prefix are
    /// evicted during the scan.
    ///
    /// Iteration order is arbitrary (map order), not sorted.
    pub fn query(&mut self, prefix: &str) -> Vec<Value> {
        self.maybe_cleanup();

        let full_prefix = self.full_key(prefix);
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| key.starts_with(&full_prefix) && entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        if !expired_keys.is_empty() {
            for key in &expired_keys {
                self.entries.remove(key);
            }
            self.stats.record_expired(expired_keys.len() as u64);
            self.stats.set_entries(self.entries.len());
        }

        let results: Vec<Value> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(&full_prefix))
            .map(|(_, entry)| entry.value.clone())
            .collect();

        if self.log_enabled {
            debug!(cache = %self.name, prefix, matched = results.len(), "prefix query");
        }
        results
    }

    // == Delete ==
    /// Removes the entry if present. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.maybe_cleanup();

        let full = self.full_key(key);
        let removed = self.entries.remove(&full).is_some();
        if removed {
            self.stats.set_entries(self.entries.len());
            if self.log_enabled {
                debug!(cache = %self.name, key, "delete");
            }
        }
        removed
    }

    // == Has ==
    /// Equivalent to `get(key).is_some()`, counting toward hit/miss stats
    /// like any other lookup.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Clear ==
    /// Empties this instance only (other named instances are untouched).
    /// Lifetime hit/miss counters survive a clear.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.stats.set_entries(0);
        if self.log_enabled {
            debug!(cache = %self.name, dropped, "clear");
        }
    }

    // == Length ==
    /// Number of resident entries, after the interval-gated sweep.
    ///
    /// Inside the cleanup interval this may count expired-but-resident
    /// entries; only `get`/`query` re-check individual entries on access.
    pub fn len(&mut self) -> usize {
        self.maybe_cleanup();
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the instance holds no entries.
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    // == Keys ==
    /// Logical (de-prefixed) keys of all resident entries, arbitrary order.
    pub fn keys(&mut self) -> Vec<String> {
        self.maybe_cleanup();
        self.entries
            .keys()
            .map(|full| self.logical_key(full).to_string())
            .collect()
    }

    // == Values ==
    /// Values of all resident entries, arbitrary order.
    pub fn values(&mut self) -> Vec<Value> {
        self.maybe_cleanup();
        self.entries
            .values()
            .map(|entry| entry.value.clone())
            .collect()
    }

    // == Entries ==
    /// (logical key, value) pairs of all resident entries, paired
    /// consistently, arbitrary order.
    pub fn entries(&mut self) -> Vec<(String, Value)> {
        self.maybe_cleanup();
        self.entries
            .iter()
            .map(|(full, entry)| (self.logical_key(full).to_string(), entry.value.clone()))
            .collect()
    }

    // == Stats ==
    /// Snapshot of this instance's counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Forced sweep: removes every expired entry now, regardless of the
    /// cleanup interval, and resets the interval clock.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let removed = self.sweep_expired();
        self.last_cleanup_at = current_timestamp_ms();
        removed
    }

    // == Internals ==
    /// Runs the sweep once the interval has elapsed since the last one.
    fn maybe_cleanup(&mut self) {
        let now = current_timestamp_ms();
        if now - self.last_cleanup_at < self.cleanup_interval_ms {
            return;
        }

        let removed = self.sweep_expired();
        self.last_cleanup_at = now;
        if self.log_enabled && removed > 0 {
            debug!(cache = %self.name, removed, "interval cleanup");
        }
    }

    /// Removes all expired entries and updates the counters.
    fn sweep_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.entries.remove(&key);
        }

        if count > 0 {
            self.stats.record_expired(count as u64);
            self.stats.set_entries(self.entries.len());
        }
        count
    }

    /// Physical key: the logical key with the instance prefix prepended.
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Logical key: the physical key with the prefix stripped. Every stored
    /// key carries the prefix; an unprefixed key is returned as-is.
    fn logical_key<'a>(&self, full_key: &'a str) -> &'a str {
        full_key
            .strip_prefix(self.key_prefix.as_str())
            .unwrap_or(full_key)
    }
}
