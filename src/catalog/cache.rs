//! TTL-expiring LRU cache used in front of the remote catalog
//!
//! Entries expire a fixed time after insertion; expiry is checked when an
//! entry is read, and an expired entry is dropped and reported as a miss.
//! Capacity is enforced with least-recently-used eviction, where a cache hit
//! refreshes recency.

use lru::LruCache;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Source of the current time for TTL checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: StdMutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: StdMutex::new(Instant::now()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Point-in-time counters for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

/// Thread-safe key-value store with per-entry TTL and LRU eviction
pub struct TtlLruCache<K: Hash + Eq, V> {
    name: &'static str,
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<K, V> TtlLruCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    /// Create a cache using the system clock
    pub fn new(name: &'static str, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self::with_clock(name, capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: &'static str,
        capacity: NonZeroUsize,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
            counters: Counters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry, refreshing its recency
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        self.get_live(&mut entries, key, now)
    }

    /// Look up several keys under one lock. Results follow `keys` order.
    pub async fn get_many<'a, I>(&self, keys: I) -> Vec<(K, Option<V>)>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        keys.into_iter()
            .map(|key| (key.clone(), self.get_live(&mut entries, key, now)))
            .collect()
    }

    /// Insert or replace an entry, evicting the coldest one when full
    pub async fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        self.insert_locked(&mut entries, key, value, now);
    }

    /// Insert several entries under one lock
    pub async fn insert_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        for (key, value) in items {
            self.insert_locked(&mut entries, key, value, now);
        }
    }

    /// Drop an entry, returning whether it was present
    pub async fn remove(&self, key: &K) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }

    /// Whether a key is stored, ignoring TTL and without touching recency
    pub async fn contains(&self, key: &K) -> bool {
        self.entries.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let dropped = entries.len();
        entries.clear();
        debug!("Cleared {} entries from {} cache", dropped, self.name);
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await;
        CacheStats {
            entries: entries.len(),
            capacity: entries.cap().get(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn get_live(&self, entries: &mut LruCache<K, CacheEntry<V>>, key: &K, now: Instant) -> Option<V> {
        let expired = match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            debug!("{} cache entry expired: {:?}", self.name, key);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn insert_locked(&self, entries: &mut LruCache<K, CacheEntry<V>>, key: K, value: V, now: Instant) {
        let entry = CacheEntry {
            value,
            inserted_at: now,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry)
            && evicted != key
        {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("{} cache full, evicted {:?}", self.name, evicted);
        }
    }
}

impl<K: Hash + Eq, V> fmt::Debug for TtlLruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlLruCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
