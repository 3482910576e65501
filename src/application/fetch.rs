//! Upstream fetch seam.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },
}

/// Raw content fetch against the upstream API.
///
/// Timeouts are a concern of the implementation behind this seam, not of the
/// callers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}
