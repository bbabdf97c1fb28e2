//! Progress-callback trait for per-item harvest events.
//!
//! Inject an [`Arc<dyn HarvestProgressCallback>`] via
//! [`crate::config::HarvestConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through the candidate list.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, or a terminal progress bar
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` because fetch and analysis
//! workers run concurrently.
//!
//! The completed/total counters passed to the progress methods increase
//! monotonically: every item fires exactly one progress event when it
//! completes, whether it succeeded, failed, or was filtered out.

use std::sync::Arc;

/// Called by the harvest pipeline as it processes each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait HarvestProgressCallback: Send + Sync {
    /// Called once after the page has been parsed.
    ///
    /// # Arguments
    /// * `candidate_count` — deduplicated image URLs found on the page
    fn on_extract_complete(&self, candidate_count: usize) {
        let _ = candidate_count;
    }

    /// Called after each candidate finishes the fetch stage, in completion
    /// order. `completed` counts successes, failures, and filter rejects
    /// alike.
    fn on_fetch_progress(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called once before the analysis stage starts.
    ///
    /// # Arguments
    /// * `total` — number of filtered images that will be described
    fn on_analyze_start(&self, total: usize) {
        let _ = total;
    }

    /// Called after each image reaches a terminal description outcome.
    fn on_analyze_progress(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called once after all stages have finished.
    ///
    /// # Arguments
    /// * `kept`      — images that survived fetching and filtering
    /// * `described` — images with a successful description
    fn on_harvest_complete(&self, kept: usize, described: usize) {
        let _ = (kept, described);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl HarvestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::HarvestConfig`].
pub type ProgressCallback = Arc<dyn HarvestProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        candidates: AtomicUsize,
        fetch_events: Mutex<Vec<(usize, usize)>>,
        completes: AtomicUsize,
    }

    impl HarvestProgressCallback for TrackingCallback {
        fn on_extract_complete(&self, candidate_count: usize) {
            self.candidates.store(candidate_count, Ordering::SeqCst);
        }

        fn on_fetch_progress(&self, completed: usize, total: usize) {
            self.fetch_events.lock().unwrap().push((completed, total));
        }

        fn on_harvest_complete(&self, kept: usize, _described: usize) {
            self.completes.store(kept, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extract_complete(5);
        cb.on_fetch_progress(1, 5);
        cb.on_analyze_start(3);
        cb.on_analyze_progress(1, 3);
        cb.on_harvest_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            candidates: AtomicUsize::new(0),
            fetch_events: Mutex::new(Vec::new()),
            completes: AtomicUsize::new(0),
        };

        tracker.on_extract_complete(3);
        tracker.on_fetch_progress(1, 3);
        tracker.on_fetch_progress(2, 3);
        tracker.on_fetch_progress(3, 3);
        tracker.on_harvest_complete(2, 0);

        assert_eq!(tracker.candidates.load(Ordering::SeqCst), 3);
        assert_eq!(
            *tracker.fetch_events.lock().unwrap(),
            vec![(1, 3), (2, 3), (3, 3)]
        );
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn HarvestProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_extract_complete(10);
        cb.on_fetch_progress(1, 10);
    }
}
