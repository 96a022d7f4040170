//! Two-tier response cache for single-prompt completions.
//!
//! # Tiers
//!
//! - **Memory**: a bounded moka cache of [`CacheEntry`] values, local to the
//!   process and lost on restart.
//! - **Durable**: one JSON object (`key -> CacheEntry`) stored under a single
//!   key in a [`DurableStore`]. It is read on a memory miss and rewritten in
//!   full on every insert.
//!
//! Expiry is an absolute timestamp taken from the gateway [`Clock`], checked
//! on every read. Expired memory entries are dropped lazily; expired durable
//! entries are swept whenever a new entry is written.
//!
//! A durable hit is promoted into memory with its original expiry, so the
//! memory tier never holds anything fresher than the durable tier.
//!
//! Caching is best-effort. Corrupt durable data reads as an empty map and
//! failed durable writes are logged and dropped.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::DurableStore;
use crate::clock::Clock;
use crate::telemetry;

/// Default storage key for the durable tier.
pub const DEFAULT_STORAGE_KEY: &str = "huginn_response_cache";

/// Configuration for the response cache.
///
/// ```rust
/// # use huginn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_memory_entries(500)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
    /// Capacity of the in-memory tier. Default: 1,000.
    pub max_memory_entries: u64,
    /// Key under which the durable tier is stored.
    pub storage_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_memory_entries: 1_000,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the capacity of the in-memory tier.
    pub fn max_memory_entries(mut self, n: u64) -> Self {
        self.max_memory_entries = n;
        self
    }

    /// Set the durable storage key.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}

/// A cached response and the epoch-millisecond instant it goes stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub expiry: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: u64) -> bool {
        now < self.expiry
    }
}

type DurableMap = HashMap<String, CacheEntry>;

/// Memory + durable response cache.
pub struct ResponseCache {
    memory: moka::sync::Cache<String, CacheEntry>,
    store: Arc<dyn DurableStore>,
    storage_key: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    // serializes read-modify-write of the durable blob
    write_lock: Mutex<()>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig, store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: moka::sync::Cache::new(config.max_memory_entries),
            store,
            storage_key: config.storage_key.clone(),
            ttl: config.ttl,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Look up a cached value. Emits cache hit/miss metrics.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now_millis();

        if let Some(entry) = self.memory.get(key) {
            if entry.is_fresh(now) {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "memory").increment(1);
                return Some(entry.value);
            }
            self.memory.invalidate(key);
        }

        match self.load_durable().remove(key) {
            Some(entry) if entry.is_fresh(now) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "durable").increment(1);
                let value = entry.value.clone();
                self.memory.insert(key.to_string(), entry);
                Some(value)
            }
            _ => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert (or overwrite) a value with a fresh TTL.
    ///
    /// Also sweeps every expired entry out of the durable tier.
    pub fn set(&self, key: &str, value: &str) {
        let now = self.clock.now_millis();
        let entry = CacheEntry {
            value: value.to_string(),
            expiry: now.saturating_add(self.ttl.as_millis() as u64),
        };
        self.memory.insert(key.to_string(), entry.clone());

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut durable = self.load_durable();
        durable.insert(key.to_string(), entry);
        durable.retain(|_, e| e.is_fresh(now));

        let json = match serde_json::to_string(&durable) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "failed to serialize durable cache");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, &json) {
            debug!(error = %e, entries = durable.len(), "durable cache write dropped");
        }
    }

    /// Evict everything from both tiers.
    pub fn clear(&self) {
        self.memory.invalidate_all();
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.store.remove(&self.storage_key) {
            debug!(error = %e, "failed to clear durable cache");
        }
    }

    /// Number of entries in the memory tier (expired ones included until
    /// they are next read).
    pub fn memory_len(&self) -> u64 {
        self.memory.run_pending_tasks();
        self.memory.entry_count()
    }

    fn load_durable(&self) -> DurableMap {
        let Some(raw) = self.store.get(&self.storage_key) else {
            return DurableMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!(error = %e, "corrupt durable cache, treating as empty");
            DurableMap::new()
        })
    }
}

/// Compute a cache key from the model, prompt and generation parameters.
///
/// Uses `DefaultHasher` (SipHash with fixed keys), which is deterministic
/// across runs of the same build; that is enough for a TTL-bounded durable
/// tier. Temperature is hashed by bit pattern so `0.5` and `0.50001` differ.
pub fn cache_key(model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    prompt.hash(&mut hasher);
    max_tokens.hash(&mut hasher);
    temperature.to_bits().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_deterministic() {
        let k1 = cache_key("m", "ping", 100, 0.5);
        let k2 = cache_key("m", "ping", 100, 0.5);
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 16);
    }

    #[test]
    fn cache_key_differs_on_max_tokens() {
        assert_ne!(cache_key("m", "ping", 100, 0.5), cache_key("m", "ping", 101, 0.5));
    }

    #[test]
    fn cache_key_differs_on_temperature() {
        assert_ne!(cache_key("m", "ping", 100, 0.5), cache_key("m", "ping", 100, 0.7));
    }

    #[test]
    fn cache_key_differs_on_model() {
        assert_ne!(cache_key("a", "ping", 100, 0.5), cache_key("b", "ping", 100, 0.5));
    }

    #[test]
    fn entry_expires_at_deadline() {
        let entry = CacheEntry {
            value: "v".into(),
            expiry: 10,
        };
        assert!(entry.is_fresh(9));
        assert!(!entry.is_fresh(10));
    }
}
