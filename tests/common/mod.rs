//! Shared fixtures for gateway integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use url::Url;

use facciata::application::fetch::{FetchError, Fetcher};
use facciata::application::pipeline::RequestPipeline;
use facciata::application::render::JsonRenderer;
use facciata::application::resolver::UpstreamResolver;
use facciata::application::site::{Site, SiteConfig};
use facciata::cache::{
    ApiCacheKey, InvalidationSink, InvalidationTarget, SinkError, SiteRegistry, derive_key,
};
use facciata::domain::types::SiteId;
use facciata::infra::http::{GatewayState, SiteContext, build_router};

pub const SITE_HOST: &str = "alpha.test";
pub const UPSTREAM: &str = "http://upstream.test/api";

/// Fetcher serving canned payloads keyed by full URL.
#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn insert(&self, url: &str, payload: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(url.to_string(), payload.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(url.to_string());
        self.responses
            .lock()
            .expect("responses lock")
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// Sink recording every delivered batch.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Vec<InvalidationTarget>>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<Vec<InvalidationTarget>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl InvalidationSink for RecordingSink {
    async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<(), SinkError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(targets.to_vec());
        Ok(())
    }
}

/// One provisioned gateway with a single site and stubbed collaborators.
pub struct TestGateway {
    pub router: Router,
    pub site: Arc<Site>,
    pub fetcher: Arc<StubFetcher>,
    pub sink: Arc<RecordingSink>,
    pub registry: Arc<SiteRegistry>,
}

pub fn gateway(config: SiteConfig, with_sink: bool) -> TestGateway {
    let fetcher = Arc::new(StubFetcher::default());
    let sink = Arc::new(RecordingSink::default());

    let site = Arc::new(Site::new(
        SiteId::from("alpha"),
        config,
        Url::parse(UPSTREAM).expect("endpoint parses"),
        fetcher.clone(),
        with_sink.then(|| sink.clone() as Arc<dyn InvalidationSink>),
    ));

    let context = Arc::new(SiteContext {
        pipeline: RequestPipeline::new(
            site.clone(),
            Arc::new(UpstreamResolver),
            Arc::new(JsonRenderer),
        ),
    });

    let registry = Arc::new(SiteRegistry::new());
    let sites = [(SITE_HOST.to_string(), context)].into_iter().collect();
    let router = build_router(GatewayState::new(sites, registry.clone()));

    TestGateway {
        router,
        site,
        fetcher,
        sink,
        registry,
    }
}

pub fn permalink_key(slug: &str) -> ApiCacheKey {
    let params = [("q".to_string(), slug.to_string())].into_iter().collect();
    derive_key("permalink", &params)
}
