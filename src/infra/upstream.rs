//! Upstream HTTP fetch.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::application::fetch::{FetchError, Fetcher};

/// Fetches raw upstream payloads over HTTP.
///
/// Timeout policy lives on the shared [`Client`] passed in at construction.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))
    }
}
