//! Content resolution: cache-or-fetch against the upstream API.
//!
//! The upstream speaks the routing-state shape (`redirect`, `statusCode`,
//! `error`, `headers`, `meta`, `content`); payloads that carry none of those
//! keys are wrapped as plain content.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::cache::{METRIC_CACHE_HIT, METRIC_CACHE_MISS, derive_key};
use crate::domain::request::ServerRequest;
use crate::domain::response::{ResolvedContent, ResponseData, ResponseState};

use super::fetch::FetchError;
use super::site::Site;

pub const TYPE_PERMALINK: &str = "permalink";
pub const TYPE_MENUS: &str = "menus";

const STATE_KEYS: [&str; 7] = [
    "redirect",
    "statusCode",
    "error",
    "headers",
    "meta",
    "content",
    "expiresSeconds",
];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("upstream payload was not valid JSON: {0}")]
    Parse(String),
    #[error("invalid upstream url: {0}")]
    Endpoint(String),
}

/// Resolves one request to routing state, consulting the site cache.
///
/// Ordinary not-found is expressed through `state.error`, never as an `Err`;
/// an `Err` is an unrecoverable transport failure, caught at the pipeline
/// boundary.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(
        &self,
        site: &Site,
        request: &ServerRequest,
    ) -> Result<ResponseData, ResolveError>;
}

/// The shipped resolver: permalink lookup over the upstream content API.
pub struct UpstreamResolver;

#[async_trait]
impl ContentResolver for UpstreamResolver {
    async fn resolve(
        &self,
        site: &Site,
        request: &ServerRequest,
    ) -> Result<ResponseData, ResolveError> {
        let mut params = BTreeMap::new();
        params.insert("q".to_string(), request.slug());
        for (key, value) in &request.query {
            params.insert(key.clone(), value.clone());
        }

        // Previews bypass the cache entirely.
        if request.query.contains_key("preview") {
            debug!(target: "facciata::resolver", site = %site.id, "preview fetch");
            let url = upstream_url(site, TYPE_PERMALINK, &params)?;
            let raw = site.fetcher.fetch(&url).await?;
            return Ok(parse_payload(&raw)?.to_response_data());
        }

        let content = cached_fetch(site, TYPE_PERMALINK, &params).await?;
        Ok(content.to_response_data())
    }
}

/// Resolve a whole-site singleton resource (navigation menus) through the
/// same cached path as slug routes.
pub async fn resolve_menus(site: &Site) -> Result<ResponseData, ResolveError> {
    let params = [("lang".to_string(), "all".to_string())].into_iter().collect();
    let content = cached_fetch(site, TYPE_MENUS, &params).await?;
    Ok(content.to_response_data())
}

/// Cache-or-fetch one upstream resource.
pub async fn cached_fetch(
    site: &Site,
    resource_type: &str,
    params: &BTreeMap<String, String>,
) -> Result<Arc<ResolvedContent>, ResolveError> {
    let key = derive_key(resource_type, params);

    if let Some(entry) = site.cache.get(&key) {
        counter!(METRIC_CACHE_HIT, "site" => site.id.to_string()).increment(1);
        debug!(
            target: "facciata::resolver",
            site = %site.id,
            resource_type,
            outcome = "hit",
            "cache lookup"
        );
        return Ok(entry);
    }

    counter!(METRIC_CACHE_MISS, "site" => site.id.to_string()).increment(1);
    debug!(
        target: "facciata::resolver",
        site = %site.id,
        resource_type,
        outcome = "miss",
        "cache lookup"
    );

    let url = upstream_url(site, resource_type, params)?;
    let raw = site.fetcher.fetch(&url).await?;
    let content = Arc::new(parse_payload(&raw)?);
    site.cache.put(key, content.clone());
    Ok(content)
}

/// Build the upstream query URL for one resource.
fn upstream_url(
    site: &Site,
    resource_type: &str,
    params: &BTreeMap<String, String>,
) -> Result<Url, ResolveError> {
    let base = site.endpoint.as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/{resource_type}"))
        .map_err(|err| ResolveError::Endpoint(err.to_string()))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Read an upstream JSON payload into routing state.
fn parse_payload(raw: &str) -> Result<ResolvedContent, ResolveError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| ResolveError::Parse(err.to_string()))?;

    let is_state_shape = value
        .as_object()
        .is_some_and(|map| STATE_KEYS.iter().any(|key| map.contains_key(*key)));

    let state = if is_state_shape {
        serde_json::from_value(value).map_err(|err| ResolveError::Parse(err.to_string()))?
    } else {
        ResponseState {
            content: Some(value),
            ..Default::default()
        }
    };

    Ok(ResolvedContent { state })
}
