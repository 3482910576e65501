//! HTTP purge sink.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

use crate::cache::{InvalidationSink, InvalidationTarget, SinkError};

/// Delivers invalidation batches to an HTTP purge endpoint (e.g. a CDN).
///
/// The endpoint receives `{ "paths": [...] }`; the wildcard target is sent
/// as `/*`.
pub struct HttpPurgeSink {
    client: Client,
    endpoint: Url,
}

impl HttpPurgeSink {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl InvalidationSink for HttpPurgeSink {
    async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<(), SinkError> {
        let paths: Vec<&str> = targets.iter().map(InvalidationTarget::as_str).collect();

        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&json!({ "paths": paths }))
            .send()
            .await
            .map_err(|err| SinkError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
