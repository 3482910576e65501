//! Invalidation sink seam.
//!
//! The external system notified of stale content, e.g. a CDN purge endpoint.
//! Delivery is best-effort: callers log failures and never retry.

use async_trait::async_trait;
use thiserror::Error;

/// One purge target delivered to the external invalidation system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    /// A single resource path.
    Path(String),
    /// The wildcard: everything the site has published.
    Everything,
}

impl InvalidationTarget {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Everything => "/*",
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalidation endpoint unreachable: {0}")]
    Transport(String),
    #[error("invalidation endpoint rejected the batch: status {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait InvalidationSink: Send + Sync {
    /// Notify the external system that the given targets are stale.
    async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<(), SinkError>;
}
