//! # Page Cache
//!
//! Rendered pages keyed by route, query string, and viewer. Entries expire
//! after a fixed TTL; writers invalidate a route explicitly when the data
//! behind it changes.
//!
//! Every invalidation bumps a generation counter. A reader that rendered
//! from data read before an invalidation must not publish its body, so
//! `insert_if_generation` refuses writes tagged with an older generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub route: String,
    pub query: String,
    /// `None` for anonymous visitors
    pub viewer: Option<Uuid>,
}

impl CacheKey {
    pub fn new(route: impl Into<String>, query: impl Into<String>, viewer: Option<Uuid>) -> Self {
        Self {
            route: route.into(),
            query: query.into(),
            viewer,
        }
    }
}

#[derive(Debug)]
struct CachedPage {
    body: String,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    entries: DashMap<CacheKey, CachedPage>,
    generation: AtomicU64,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached body if it is still fresh. Stale entries are dropped.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let fresh = {
            let entry = self.entries.get(key)?;
            (entry.stored_at.elapsed() < self.ttl).then(|| entry.body.clone())
        };
        if fresh.is_none() {
            // Re-checked under the write lock: a concurrent insert may have
            // replaced the stale entry with a fresh one.
            self.entries
                .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        }
        fresh
    }

    /// Current invalidation generation; read it before loading the data a
    /// body is rendered from.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn insert(&self, key: CacheKey, body: String) {
        self.entries.insert(
            key,
            CachedPage {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Stores `body` unless the cache was invalidated after `generation`
    /// was read. Returns whether the body was stored.
    pub fn insert_if_generation(&self, key: CacheKey, body: String, generation: u64) -> bool {
        // The entry guard holds the shard lock, so an invalidation cannot
        // slip between the check and the write.
        let entry = self.entries.entry(key);
        if self.generation() != generation {
            log::debug!("dropped page rendered before an invalidation");
            return false;
        }
        entry.insert(CachedPage {
            body,
            stored_at: Instant::now(),
        });
        true
    }

    /// Drops every entry for `route`, whatever the query or viewer.
    pub fn invalidate_route(&self, route: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.retain(|key, _| key.route != route);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
