//! Cache-control request handling.
//!
//! Consumed from the HTTP boundary: a `destroy` action drops one resource
//! from the site cache and queues a coalesced purge; a `flush` clears the
//! site cache and purges everything immediately, discarding any pending
//! batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::cache::{InvalidationRequest, InvalidationTarget, SiteRegistry, derive_key};

use super::site::Site;

/// Wire payload: `{ "cache": { "action": ..., "params": ... } }`.
#[derive(Debug, Default, Deserialize)]
pub struct CacheControlBody {
    #[serde(default)]
    pub cache: Option<CacheControlPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CacheControlPayload {
    Destroy { params: DestroyParams },
    Flush,
}

#[derive(Debug, Deserialize)]
pub struct DestroyParams {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub slug: String,
}

/// Outcome reported to the caller.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CacheControlOutcome {
    Ok { status: &'static str },
    Invalid { error: &'static str },
}

impl CacheControlOutcome {
    pub fn ok() -> Self {
        Self::Ok { status: "ok" }
    }

    pub fn invalid() -> Self {
        Self::Invalid {
            error: "Invalid request",
        }
    }
}

/// Apply one cache-control request to a site.
///
/// Cache mutations are visible to subsequent lookups before this returns;
/// sink notification is deferred through the coalescer for `destroy` and
/// issued immediately for `flush`.
pub async fn handle_cache_control(
    site: &Site,
    registry: &SiteRegistry,
    body: CacheControlBody,
) -> CacheControlOutcome {
    let Some(payload) = body.cache else {
        return CacheControlOutcome::invalid();
    };

    match payload {
        CacheControlPayload::Destroy { params } => {
            let mut query = BTreeMap::new();
            query.insert("q".to_string(), params.slug.clone());
            let key = derive_key(&params.resource_type, &query);
            site.cache.delete(&key);

            debug!(
                target: "facciata::invalidation",
                site = %site.id,
                resource_type = %params.resource_type,
                slug = %params.slug,
                "cache entry destroyed"
            );

            if let Some(coalescer) = registry.coalescer(site) {
                coalescer.push(InvalidationRequest::Destroy {
                    resource_type: params.resource_type,
                    slug: params.slug,
                });
            }
        }
        CacheControlPayload::Flush => {
            site.cache.clear();
            info!(target: "facciata::invalidation", site = %site.id, "site cache flushed");

            if let Some(sink) = &site.sink {
                if let Some(coalescer) = registry.coalescer(site) {
                    coalescer.reset();
                }

                // A flush is a single event already; it bypasses the window.
                if let Err(err) = sink.invalidate(&[InvalidationTarget::Everything]).await {
                    error!(
                        target: "facciata::invalidation",
                        site = %site.id,
                        error = %err,
                        "wildcard invalidation failed"
                    );
                }
            }
        }
    }

    CacheControlOutcome::ok()
}
