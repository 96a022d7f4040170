//! Caching subsystem.
//!
//! - [`response::ResponseCache`]: two-tier (memory + durable) TTL cache for
//!   single-prompt completions. See the [`response`] module docs.
//! - [`store::DurableStore`]: the key-value port behind the durable tier,
//!   with [`MemoryStore`] and [`FileStore`] implementations.

pub mod response;
pub mod store;

pub use response::{CacheConfig, CacheEntry, DEFAULT_STORAGE_KEY, ResponseCache, cache_key};
pub use store::{DurableStore, FileStore, MemoryStore};
