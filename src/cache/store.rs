//! Per-site response cache storage.

use std::sync::{Arc, RwLock};

use lru::LruCache;

use crate::domain::response::ResolvedContent;

use super::config::CacheConfig;
use super::key::ApiCacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// One site's resolved-content cache.
///
/// Entries are stored verbatim and removed only through explicit invalidation;
/// the LRU bound is capacity management, not freshness. Each site owns its own
/// store, so clearing one site can never evict another site's entries.
pub struct ResponseCache {
    entries: RwLock<LruCache<ApiCacheKey, Arc<ResolvedContent>>>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.response_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &ApiCacheKey) -> Option<Arc<ResolvedContent>> {
        rw_write(&self.entries, SOURCE, "get").get(key).cloned()
    }

    pub fn put(&self, key: ApiCacheKey, value: Arc<ResolvedContent>) {
        rw_write(&self.entries, SOURCE, "put").put(key, value);
    }

    /// Remove one entry. Absent keys are a no-op.
    pub fn delete(&self, key: &ApiCacheKey) {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
    }

    /// Remove every entry for this site.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
