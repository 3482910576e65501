//! HTTP boundary: one listener, site selection by `Host` header.
//!
//! Requests to a site's cache-control path are dispatched to the
//! invalidation handler; everything else runs through that site's request
//! pipeline.

pub mod middleware;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header::HOST, request::Parts},
    middleware::from_fn,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::warn;

use crate::application::invalidation::{CacheControlBody, handle_cache_control};
use crate::application::pipeline::{PipelineResponse, RequestPipeline};
use crate::cache::SiteRegistry;
use crate::domain::request::ServerRequest;

use middleware::{log_responses, set_request_context};

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// One provisioned site with its request pipeline.
pub struct SiteContext {
    pub pipeline: RequestPipeline,
}

/// Shared router state: host lookup plus the per-site coalescer registry.
#[derive(Clone)]
pub struct GatewayState {
    sites: Arc<HashMap<String, Arc<SiteContext>>>,
    registry: Arc<SiteRegistry>,
}

impl GatewayState {
    pub fn new(sites: HashMap<String, Arc<SiteContext>>, registry: Arc<SiteRegistry>) -> Self {
        Self {
            sites: Arc::new(sites),
            registry,
        }
    }

    fn site_for(&self, host: &str) -> Option<Arc<SiteContext>> {
        if let Some(context) = self.sites.get(host) {
            return Some(context.clone());
        }
        // Host headers may carry a port the configuration omits.
        let bare = host.split(':').next().unwrap_or(host);
        self.sites.get(bare).cloned()
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

async fn handle(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let Some(context) = state.site_for(&host) else {
        warn!(target: "facciata::http", host = %host, "no site answers for host");
        return (StatusCode::NOT_FOUND, "unknown site").into_response();
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, BODY_LIMIT_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let server_request = to_server_request(&parts, body, &host);
    let site = context.pipeline.site();

    if parts.method == Method::POST && parts.uri.path() == site.config.cache.control_path {
        let payload: CacheControlBody =
            serde_json::from_slice(&server_request.body).unwrap_or_default();
        let outcome = handle_cache_control(site, &state.registry, payload).await;
        return Json(outcome).into_response();
    }

    into_response(context.pipeline.handle(&server_request).await)
}

fn to_server_request(parts: &Parts, body: Bytes, host: &str) -> ServerRequest {
    let query = parts.uri.query().map(parse_query).unwrap_or_default();
    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");

    ServerRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        path_param: Some(parts.uri.path().to_string()),
        query,
        body,
        host_url: format!("{scheme}://{host}"),
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn into_response(pipeline: PipelineResponse) -> Response {
    let mut response = Response::builder()
        .status(pipeline.status)
        .body(Body::from(pipeline.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());

    let headers = response.headers_mut();
    for (name, value) in &pipeline.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    response
}
