//! Response Cache
//!
//! Bounded LRU store for parsed plans. Entries carry their creation time;
//! freshness is judged by the caller against a TTL, so `get` returns stale
//! entries too and the caller decides whether to drop them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::constants::cache as cache_constants;

/// Cached value with its creation time
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Valid only while `age < ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Front is least recently used
    order: VecDeque<String>,
    stats: CacheStats,
}

impl<V> CacheState<V> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }

    fn forget(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

/// LRU cache keyed by request fingerprint
pub struct ResponseCache<V> {
    state: Mutex<CacheState<V>>,
    max_size: usize,
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(cache_constants::MAX_ENTRIES)
    }
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                stats: CacheStats::default(),
            }),
            max_size: max_size.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, marking it most recently used. Stale entries are
    /// returned as-is.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let mut state = self.lock();
        match state.entries.get(key).cloned() {
            Some(entry) => {
                state.touch(key);
                state.stats.hits += 1;
                Some(entry)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or refresh `key`. A new key at capacity evicts the least
    /// recently used entry first.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut state = self.lock();

        if state.entries.contains_key(&key) {
            state.forget(&key);
        } else if state.entries.len() >= self.max_size
            && let Some(oldest) = state.order.pop_front()
        {
            state.entries.remove(&oldest);
            state.stats.evictions += 1;
            trace!(key = %oldest, "Evicted least recently used cache entry");
        }

        state.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
        state.order.push_back(key);
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        let mut state = self.lock();
        state.forget(key);
        state.entries.remove(key).map(|entry| entry.value)
    }

    /// Presence check that ignores freshness and does not touch recency
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}
