//! Configuration Module
//!
//! Handles loading cache-adapter configuration from environment variables.

use std::env;

use crate::cache::DEFAULT_CLEANUP_INTERVAL_MS;

/// Cache behavior for one adapter.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether the cache-aside path is active at all
    pub enabled: bool,
    /// Key prefix for every cached entry; defaults to the table name
    pub prefix: Option<String>,
    /// TTL in seconds for cached entries; `None` means entries never expire
    pub ttl_seconds: Option<u64>,
    /// Named cache instance to attach to; defaults to the table name
    pub instance_name: Option<String>,
    /// Minimum milliseconds between expired-entry sweeps
    pub cleanup_interval_ms: u64,
    /// Emit per-operation cache logs
    pub enable_logging: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Toggle the cache-aside path (default: true)
    /// - `CACHE_PREFIX` - Key prefix for cached entries (default: table name)
    /// - `CACHE_TTL_SECONDS` - Entry TTL in seconds (default: no expiry)
    /// - `CACHE_INSTANCE_NAME` - Cache instance to attach to (default: table name)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep interval in ms (default: 1800000)
    /// - `CACHE_LOGGING` - Emit per-operation cache logs (default: false)
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("CACHE_ENABLED", true),
            prefix: env::var("CACHE_PREFIX").ok(),
            ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok()),
            instance_name: env::var("CACHE_INSTANCE_NAME").ok(),
            cleanup_interval_ms: env::var("CACHE_CLEANUP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_MS),
            enable_logging: env_flag("CACHE_LOGGING", false),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: None,
            ttl_seconds: None,
            instance_name: None,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            enable_logging: false,
        }
    }
}

/// Reads a boolean flag, accepting `true`/`false`/`1`/`0` in any case.
fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.prefix, None);
        assert_eq!(config.ttl_seconds, None);
        assert_eq!(config.instance_name, None);
        assert_eq!(config.cleanup_interval_ms, DEFAULT_CLEANUP_INTERVAL_MS);
        assert!(!config.enable_logging);
    }

    // Environment mutation stays inside one test to avoid cross-test races
    #[test]
    fn test_config_from_env() {
        env::remove_var("CACHE_ENABLED");
        env::remove_var("CACHE_PREFIX");
        env::remove_var("CACHE_TTL_SECONDS");
        env::remove_var("CACHE_INSTANCE_NAME");
        env::remove_var("CACHE_CLEANUP_INTERVAL_MS");
        env::remove_var("CACHE_LOGGING");

        let config = CacheConfig::from_env();
        assert!(config.enabled);
        assert_eq!(config.prefix, None);
        assert_eq!(config.ttl_seconds, None);
        assert_eq!(config.instance_name, None);
        assert_eq!(config.cleanup_interval_ms, DEFAULT_CLEANUP_INTERVAL_MS);
        assert!(!config.enable_logging);

        env::set_var("CACHE_ENABLED", "0");
        env::set_var("CACHE_PREFIX", "users.");
        env::set_var("CACHE_TTL_SECONDS", "300");
        env::set_var("CACHE_INSTANCE_NAME", "shared");
        env::set_var("CACHE_CLEANUP_INTERVAL_MS", "5000");
        env::set_var("CACHE_LOGGING", "TRUE");

        let config = CacheConfig::from_env();
        assert!(!config.enabled);
        assert_eq!(config.prefix.as_deref(), Some("users."));
        assert_eq!(config.ttl_seconds, Some(300));
        assert_eq!(config.instance_name.as_deref(), Some("shared"));
        assert_eq!(config.cleanup_interval_ms, 5000);
        assert!(config.enable_logging);

        // Unparseable values fall back to defaults
        env::set_var("CACHE_TTL_SECONDS", "soon");
        env::set_var("CACHE_ENABLED", "maybe");
        let config = CacheConfig::from_env();
        assert_eq!(config.ttl_seconds, None);
        assert!(config.enabled);

        env::remove_var("CACHE_ENABLED");
        env::remove_var("CACHE_PREFIX");
        env::remove_var("CACHE_TTL_SECONDS");
        env::remove_var("CACHE_INSTANCE_NAME");
        env::remove_var("CACHE_CLEANUP_INTERVAL_MS");
        env::remove_var("CACHE_LOGGING");
    }
}
