//! Rendered page cache
//!
//! Process-local map from a request key to a rendered page. Entries expire a
//! fixed time after insertion; expired entries are evicted lazily on lookup
//! and swept when the cache is full. Writes never invalidate entries, so a
//! listing may lag behind the store until the entry expires or the cache is
//! cleared.

use crate::error::Result;
use crate::render::RenderedPage;
use dashmap::DashMap;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

lazy_static! {
    static ref CACHE_HIT: IntCounter = register_int_counter!(
        "blog_page_cache_hit_total",
        "Total number of page cache hits"
    )
    .expect("Failed to register blog_page_cache_hit_total");

    static ref CACHE_MISS: IntCounter = register_int_counter!(
        "blog_page_cache_miss_total",
        "Total number of page cache misses (absent or expired)"
    )
    .expect("Failed to register blog_page_cache_miss_total");

    static ref CACHE_CLEAR: IntCounter = register_int_counter!(
        "blog_page_cache_clear_total",
        "Total number of manual page cache clears"
    )
    .expect("Failed to register blog_page_cache_clear_total");

    static ref CACHE_EVICTION: IntCounter = register_int_counter!(
        "blog_page_cache_eviction_total",
        "Total number of page cache evictions (expiry or entry limit)"
    )
    .expect("Failed to register blog_page_cache_eviction_total");
}

const DEFAULT_MAX_ENTRIES: usize = 1_000;

#[derive(Debug, Clone)]
struct CachedEntry {
    page: RenderedPage,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(page: RenderedPage, ttl: Duration) -> Self {
        Self {
            page,
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Time-expiring cache of rendered pages, bounded by entry count.
pub struct PageCache {
    store: DashMap<String, CachedEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_limits(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        debug!(
            ttl_secs = ttl.as_secs(),
            max_entries, "Initializing page cache"
        );
        Self {
            store: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached page for `key`, if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<RenderedPage> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                CACHE_HIT.inc();
                debug!(key = %key, "page cache HIT");
                return Some(entry.page.clone());
            }
        }

        // Drop the read guard before removing.
        if self.store.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            CACHE_EVICTION.inc();
        }
        CACHE_MISS.inc();
        debug!(key = %key, "page cache MISS");
        None
    }

    /// Store `page` under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, page: RenderedPage) {
        if self.ttl.is_zero() {
            return;
        }
        let key = key.into();
        if !self.store.contains_key(&key) {
            self.make_room();
        }
        self.store.insert(key, CachedEntry::new(page, self.ttl));
    }

    /// Free a slot when full: sweep expired entries, then drop the entry
    /// closest to expiry.
    fn make_room(&self) {
        if self.store.len() < self.max_entries {
            return;
        }

        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let mut evicted = before.saturating_sub(self.store.len());

        while self.store.len() >= self.max_entries {
            let oldest = self
                .store
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            let Some(key) = oldest else {
                break;
            };
            self.store.remove(&key);
            evicted += 1;
        }

        CACHE_EVICTION.inc_by(evicted as u64);
        debug!(evicted, max_entries = self.max_entries, "page cache full, evicted entries");
    }

    /// Return the cached page for `key`, or render, store and return it.
    ///
    /// Render failures are returned as-is and nothing is stored.
    pub async fn get_or_render<F, Fut>(&self, key: &str, render: F) -> Result<RenderedPage>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RenderedPage>>,
    {
        if let Some(page) = self.get(key) {
            return Ok(page);
        }

        let page = render().await?;
        self.insert(key, page.clone());
        Ok(page)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let dropped = self.store.len();
        self.store.clear();
        CACHE_CLEAR.inc();
        debug!(dropped, "page cache cleared");
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
