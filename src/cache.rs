//! # Response Cache
//! Bounded in-memory store for decoded upstream payloads, keyed by the exact request URL.
//!
//! Eviction is strict insertion order (FIFO): reads never refresh an entry's position.
//! Staleness is the reader's call: `get` hands back stale entries too, and the
//! fetcher decides via [`CacheEntry::is_fresh`].

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use metrics::counter;
use serde_json::Value;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub inserted_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Thread-safe FIFO-bounded cache.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// Keys from oldest to newest insertion.
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // map and queue are only touched by infallible ops, so a poisoned guard is consistent
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Insert or replace `key`. A replaced key moves to the newest position.
    /// Returns the key evicted to make room, if any.
    pub fn put(&self, key: impl Into<String>, value: Value) -> Option<String> {
        let key = key.into();
        let mut inner = self.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }

        let mut evicted = None;
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                counter!("wikitrends_cache_evictions_total").increment(1);
                tracing::debug!(target: "cache", key = %oldest, "evicted oldest entry");
                evicted = Some(oldest);
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
