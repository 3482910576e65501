//! Per-site coalescer registry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::application::site::Site;
use crate::domain::types::SiteId;

use super::coalescer::InvalidationCoalescer;

/// Holds one invalidation coalescer per site, created on first use.
///
/// Unrelated sites never share invalidation state. The registry's lifecycle
/// is tied to site provisioning, not to any single request; there is no
/// removal path in normal operation.
pub struct SiteRegistry {
    coalescers: DashMap<SiteId, Arc<InvalidationCoalescer>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self {
            coalescers: DashMap::new(),
        }
    }

    /// The site's coalescer, constructed and wired to the site's sink on
    /// first call. Repeated calls for the same site return the same instance.
    ///
    /// Sites without a configured invalidation sink have no coalescer.
    pub fn coalescer(&self, site: &Site) -> Option<Arc<InvalidationCoalescer>> {
        let sink = site.sink.clone()?;
        let coalescer = self
            .coalescers
            .entry(site.id.clone())
            .or_insert_with(|| {
                Arc::new(InvalidationCoalescer::new(
                    site.id.clone(),
                    site.config.cache.invalidation_window(),
                    sink,
                ))
            })
            .clone();
        Some(coalescer)
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
