//! In-flight request deduplication.
//!
//! Concurrent callers asking for the same cache key share one underlying
//! call. The first caller's factory is invoked and its future registered
//! under the registry lock *before* anyone awaits, so two callers can never
//! both observe "nothing in flight" and both hit the network.
//!
//! The registry only holds a weak handle. The registration is removed when
//! the underlying future is dropped: once it settles, or once every waiter
//! has dropped its handle without waiting for the result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::debug;

use crate::telemetry;

/// A cloneable handle on an in-flight call.
pub type InflightFuture<T> = Shared<BoxFuture<'static, T>>;

struct Entry<T> {
    id: u64,
    future: WeakShared<BoxFuture<'static, T>>,
}

type Entries<T> = Arc<Mutex<HashMap<String, Entry<T>>>>;

/// Registry of pending calls keyed by request fingerprint.
pub struct InflightRegistry<T: Clone> {
    entries: Entries<T>,
    next_id: AtomicU64,
}

impl<T> InflightRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the call registered under `key`, or start one with `factory`.
    ///
    /// `factory` is only invoked when nothing is in flight for `key`.
    pub fn run<F, Fut>(&self, key: &str, factory: F) -> InflightFuture<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(key).and_then(|e| e.future.upgrade()) {
            metrics::counter!(telemetry::DEDUP_JOINS_TOTAL).increment(1);
            debug!(key, "joining in-flight request");
            return existing;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = Deregister {
            entries: Arc::clone(&self.entries),
            key: key.to_string(),
            id,
        };
        let work = factory();
        let shared = async move {
            let _guard = guard;
            work.await
        }
        .boxed()
        .shared();

        if let Some(future) = shared.downgrade() {
            entries.insert(key.to_string(), Entry { id, future });
        }
        shared
    }

    /// Whether a call for `key` is currently outstanding.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of outstanding calls.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its registration when the shared future is dropped.
struct Deregister<T> {
    entries: Entries<T>,
    key: String,
    id: u64,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // a newer call may already own the key
        if entries.get(&self.key).is_some_and(|e| e.id == self.id) {
            entries.remove(&self.key);
        }
    }
}

impl<T> Default for InflightRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
