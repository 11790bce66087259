//! # TTL Cache
//! Process-wide memoization for provider lookups.
//!
//! Each entry lives for a fixed TTL (default 1h). Expired entries are evicted
//! by the read that finds them; there is no background sweep and no size
//! bound. Time comes from an injected [`Clock`] so tests can move it forward.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrics::counter;
use tracing::debug;

/// Default lifetime of a cached lookup.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_unix: u64) -> Self {
        Self {
            now: AtomicU64::new(start_unix),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    pub fn set(&self, unix: u64) {
        self.now.store(unix, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: u64,
}

/// Thread-safe TTL map from request signature to value.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("len", &self.lock().len())
            .finish()
    }
}

impl<V: Clone> TtlCache<V> {
    /// `name` labels the hit/miss counters (e.g. "search", "tmdb").
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the stored value if it is still fresh.
    /// A stale entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_unix();
        let mut entries = self.lock();

        let fresh = match entries.get(key) {
            Some(entry) if now.saturating_sub(entry.stored_at) < self.ttl.as_secs() => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                debug!(target: "cache", cache = self.name, key, "evicted expired entry");
                None
            }
            None => None,
        };
        drop(entries);

        match fresh {
            Some(v) => {
                counter!("ranklist_cache_hits_total", "cache" => self.name).increment(1);
                Some(v)
            }
            None => {
                counter!("ranklist_cache_misses_total", "cache" => self.name).increment(1);
                None
            }
        }
    }

    /// Store a value stamped with the current time. An existing entry under
    /// the same key is replaced, never mutated in place.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let stored_at = self.clock.now_unix();
        self.lock()
            .insert(key.into(), CacheEntry { value, stored_at });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<V> TtlCache<V> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // Only whole-entry inserts/removes happen under the lock.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
