//! Application state shared by every handler.

use crate::auth::SessionKeys;
use crate::cache::PageCache;
use crate::config::Config;
use crate::db::{BlogRepository, InMemoryBlogRepository};
use crate::render::{JsonRenderer, Renderer};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn BlogRepository>,
    pub cache: Arc<PageCache>,
    pub renderer: Arc<dyn Renderer>,
    pub sessions: Arc<SessionKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the state around an already-connected repository.
    pub fn new(config: Config, repo: Arc<dyn BlogRepository>) -> Self {
        let cache = PageCache::with_limits(
            Duration::from_secs(config.cache.page_ttl_secs),
            config.cache.max_entries,
        );
        let sessions = SessionKeys::from_config(&config.auth);

        Self {
            repo,
            cache: Arc::new(cache),
            renderer: Arc::new(JsonRenderer),
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }

    /// State over a fresh in-memory store.
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(InMemoryBlogRepository::new()))
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn per_page(&self) -> usize {
        self.config.pagination.per_page
    }
}
