//! Per-site cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_INVALIDATION_WINDOW_MS: u64 = 15_000;
const DEFAULT_RESPONSE_LIMIT: usize = 512;
const DEFAULT_CONTROL_PATH: &str = "/_cache";

/// Cache behavior for one site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Quiet window before a coalesced invalidation batch flushes.
    pub invalidation_window_ms: u64,
    /// Maximum resolved entries kept in the site's response cache.
    pub response_limit: usize,
    /// External purge endpoint; absent disables sink notifications.
    pub invalidator: Option<String>,
    /// Request path that accepts cache-control requests.
    pub control_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            invalidation_window_ms: DEFAULT_INVALIDATION_WINDOW_MS,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            invalidator: None,
            control_path: DEFAULT_CONTROL_PATH.to_string(),
        }
    }
}

impl CacheConfig {
    /// The quiet window as a duration.
    pub fn invalidation_window(&self) -> Duration {
        Duration::from_millis(self.invalidation_window_ms)
    }

    /// Returns the response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
