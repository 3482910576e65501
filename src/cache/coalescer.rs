//! Time-windowed invalidation batching.
//!
//! Converts a burst of fine-grained invalidation notifications (one per
//! changed resource during a bulk edit) into a single batched call to the
//! site's invalidation sink. The first buffered request arms the quiet-window
//! timer; later requests join the batch without extending it, which caps
//! worst-case staleness even under a steady trickle of edits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::types::SiteId;

use super::lock::mutex_lock;
use super::sink::{InvalidationSink, InvalidationTarget};
use super::{METRIC_INVALIDATION_BATCH_SIZE, METRIC_INVALIDATION_FLUSH};

const SOURCE: &str = "cache::coalescer";

/// One unit of pending invalidation work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationRequest {
    /// Remove a single resource.
    Destroy { resource_type: String, slug: String },
    /// Clear everything the site has published.
    Flush,
}

impl InvalidationRequest {
    /// The purge target this request maps to at flush time.
    pub fn target(&self) -> InvalidationTarget {
        match self {
            Self::Destroy { slug, .. } => InvalidationTarget::Path(slug.clone()),
            Self::Flush => InvalidationTarget::Everything,
        }
    }
}

struct CoalescerState {
    buffer: Vec<InvalidationRequest>,
    timer: Option<JoinHandle<()>>,
}

/// Per-site batching queue in front of the invalidation sink.
///
/// `push`, the timer-fire flush, and `reset` are mutually exclusive over the
/// buffer/timer pair: a reset racing a flush can never deliver a discarded
/// buffer, and a flush that already swapped the buffer out is never aborted
/// mid-delivery.
pub struct InvalidationCoalescer {
    site: SiteId,
    quiet_window: Duration,
    sink: Arc<dyn InvalidationSink>,
    state: Arc<Mutex<CoalescerState>>,
}

impl InvalidationCoalescer {
    pub fn new(
        site: SiteId,
        quiet_window: Duration,
        sink: Arc<dyn InvalidationSink>,
    ) -> Self {
        Self {
            site,
            quiet_window,
            sink,
            state: Arc::new(Mutex::new(CoalescerState {
                buffer: Vec::new(),
                timer: None,
            })),
        }
    }

    /// Append a request, arming the quiet-window timer if none is armed.
    ///
    /// The timer is never restarted by later pushes.
    pub fn push(&self, request: InvalidationRequest) {
        let mut state = mutex_lock(&self.state, SOURCE, "push");
        state.buffer.push(request);

        if state.timer.is_none() {
            let site = self.site.clone();
            let sink = self.sink.clone();
            let shared = self.state.clone();
            let quiet_window = self.quiet_window;

            debug!(
                target: "facciata::cache",
                site = %self.site,
                window_ms = quiet_window.as_millis() as u64,
                "invalidation window armed"
            );

            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(quiet_window).await;
                flush(site, sink, shared).await;
            }));
        }
    }

    /// Cancel any armed timer and discard buffered requests without flushing.
    ///
    /// Used when a more drastic event, e.g. a manual cache clear, supersedes
    /// the pending fine-grained invalidations.
    pub fn reset(&self) {
        let mut state = mutex_lock(&self.state, SOURCE, "reset");
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let discarded = state.buffer.len();
        state.buffer.clear();

        if discarded > 0 {
            debug!(
                target: "facciata::cache",
                site = %self.site,
                discarded,
                "pending invalidations discarded"
            );
        }
    }

    /// Number of requests waiting for the window to elapse.
    pub fn pending(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "pending").buffer.len()
    }
}

/// Timer-fire path: swap the buffer out under the lock, then deliver.
///
/// The timer handle is cleared inside the critical section, so a `reset`
/// arriving after the swap finds nothing to cancel.
async fn flush(
    site: SiteId,
    sink: Arc<dyn InvalidationSink>,
    state: Arc<Mutex<CoalescerState>>,
) {
    let batch = {
        let mut state = mutex_lock(&state, SOURCE, "flush");
        state.timer = None;
        std::mem::take(&mut state.buffer)
    };

    if batch.is_empty() {
        return;
    }

    let targets: Vec<InvalidationTarget> =
        batch.iter().map(InvalidationRequest::target).collect();

    counter!(METRIC_INVALIDATION_FLUSH, "site" => site.to_string()).increment(1);
    histogram!(METRIC_INVALIDATION_BATCH_SIZE).record(targets.len() as f64);

    match sink.invalidate(&targets).await {
        Ok(()) => debug!(
            target: "facciata::cache",
            site = %site,
            batch = targets.len(),
            "invalidation batch delivered"
        ),
        Err(err) => error!(
            target: "facciata::cache",
            site = %site,
            error = %err,
            batch = targets.len(),
            "invalidation batch failed"
        ),
    }
}
