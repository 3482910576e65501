//! Site model: one tenant's configuration, cache, and serving context.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::cache::{CacheConfig, InvalidationSink, ResponseCache};
use crate::domain::types::SiteId;

use super::fetch::Fetcher;

const DEFAULT_STATUS_CODE: u16 = 200;
const DEFAULT_EXPIRES_SECONDS: u64 = 2_592_000;

/// How error responses are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderErrorMode {
    /// Serve the raw serialized error.
    Off,
    /// Render the error view without embedded detail.
    #[default]
    Short,
    /// Render the error view with the error detail embedded.
    Full,
}

/// Router defaults applied to every outgoing response.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub expires_seconds: u64,
    pub trailing_slash_fix: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            status_code: DEFAULT_STATUS_CODE,
            headers: BTreeMap::new(),
            expires_seconds: DEFAULT_EXPIRES_SECONDS,
            trailing_slash_fix: true,
        }
    }
}

/// Error rendering policy.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub render_error: RenderErrorMode,
}

/// Fully-resolved per-site configuration, read once at provisioning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub router: RouterConfig,
    pub render: RenderConfig,
    pub cache: CacheConfig,
}

/// One tenant: identity, configuration, response cache, fetch capability,
/// and the optional invalidation sink.
///
/// Provisioned at startup for the process lifetime; never mutated
/// concurrently except through its owned cache and coalescer state. Log lines
/// for a site carry its id as a structured field.
pub struct Site {
    pub id: SiteId,
    pub config: SiteConfig,
    /// Upstream content API endpoint.
    pub endpoint: Url,
    pub cache: ResponseCache,
    pub fetcher: Arc<dyn Fetcher>,
    pub sink: Option<Arc<dyn InvalidationSink>>,
}

impl Site {
    pub fn new(
        id: SiteId,
        config: SiteConfig,
        endpoint: Url,
        fetcher: Arc<dyn Fetcher>,
        sink: Option<Arc<dyn InvalidationSink>>,
    ) -> Self {
        let cache = ResponseCache::new(&config.cache);
        Self {
            id,
            config,
            endpoint,
            cache,
            fetcher,
            sink,
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! Shared fixtures for unit tests across the crate.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::application::fetch::FetchError;
    use crate::cache::{InvalidationTarget, SinkError};

    use super::*;

    /// Fetcher serving canned payloads keyed by full URL.
    #[derive(Default)]
    pub struct StubFetcher {
        responses: Mutex<HashMap<String, String>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn with_response(self, url: &str, payload: &str) -> Self {
            self.responses
                .lock()
                .expect("responses lock")
                .insert(url.to_string(), payload.to_string());
            self
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

    pub fn recording_sink() -> Arc<RecordingSink> {
        Arc::new(RecordingSink::default())
    }

    pub fn endpoint() -> Url {
        Url::parse("http://upstream.test/api").expect("endpoint parses")
    }

    pub fn site_without_sink(id: &str) -> Site {
        Site::new(
            SiteId::from(id),
            SiteConfig::default(),
            endpoint(),
            Arc::new(StubFetcher::default()),
            None,
        )
    }

    pub fn site_with_sink(id: &str, sink: Arc<RecordingSink>) -> (Site, Arc<RecordingSink>) {
        let site = Site::new(
            SiteId::from(id),
            SiteConfig::default(),
            endpoint(),
            Arc::new(StubFetcher::default()),
            Some(sink.clone()),
        );
        (site, sink)
    }
}
