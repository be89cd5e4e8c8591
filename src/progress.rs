//! Progress-callback trait for extraction and geocoding events.
//!
//! Inject an [`Arc<dyn YutaiProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] or
//! [`crate::config::GeocodeConfigBuilder::progress_callback`] to receive
//! events as sources are extracted and addresses are resolved.
//!
//! Callers forward events wherever they like (a terminal progress bar, a
//! channel, a log) without the library knowing how the host application
//! communicates.
//!
//! # Example
//!
//! ```rust
//! use yutai_map::{YutaiProgressCallback, GeocodeConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl YutaiProgressCallback for Counter {
//!     fn on_address_resolved(&self, _address: &str, _found: bool) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = GeocodeConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction and geocoding stages.
///
/// Implementations must be `Send + Sync`: sources and addresses are processed
/// concurrently, so `on_source_complete`, `on_source_error` and
/// `on_address_resolved` may fire from different tasks at the same time.
/// All methods default to no-ops.
pub trait YutaiProgressCallback: Send + Sync {
    /// Called once before any source is read.
    fn on_extraction_start(&self, total_sources: usize) {
        let _ = total_sources;
    }

    /// Called when a source produced records.
    ///
    /// # Arguments
    /// * `source`       — source file name
    /// * `record_count` — deduplicated records extracted from it
    fn on_source_complete(&self, source: &str, record_count: usize) {
        let _ = (source, record_count);
    }

    /// Called when a source failed or yielded nothing.
    fn on_source_error(&self, source: &str, error: &str) {
        let _ = (source, error);
    }

    /// Called once before bulk geocoding starts.
    ///
    /// # Arguments
    /// * `unique_addresses` — distinct address strings that will be resolved
    fn on_geocode_start(&self, unique_addresses: usize) {
        let _ = unique_addresses;
    }

    /// Called after each unique address is resolved (cache or provider).
    fn on_address_resolved(&self, address: &str, found: bool) {
        let _ = (address, found);
    }

    /// Called once after every address has been attempted.
    fn on_geocode_complete(&self, resolved: usize, unresolved: usize) {
        let _ = (resolved, unresolved);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl YutaiProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the config structs.
pub type ProgressCallback = Arc<dyn YutaiProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        sources_total: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        found: AtomicUsize,
        missing: AtomicUsize,
    }

    impl YutaiProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_sources: usize) {
            self.sources_total.store(total_sources, Ordering::SeqCst);
        }

        fn on_source_complete(&self, _source: &str, _record_count: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_source_error(&self, _source: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_address_resolved(&self, _address: &str, found: bool) {
            if found {
                self.found.fetch_add(1, Ordering::SeqCst);
            } else {
                self.missing.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(2);
        cb.on_source_complete("a.pdf", 10);
        cb.on_source_error("b.pdf", "corrupt");
        cb.on_geocode_start(5);
        cb.on_address_resolved("東京都渋谷区", true);
        cb.on_geocode_complete(4, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_extraction_start(3);
        tracker.on_source_complete("a.pdf", 12);
        tracker.on_source_complete("b.pdf", 3);
        tracker.on_source_error("c.pdf", "no text");
        tracker.on_address_resolved("東京都渋谷区渋谷2-1-1", true);
        tracker.on_address_resolved("不明", false);

        assert_eq!(tracker.sources_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.found.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.missing.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_geocode_start(10);
        cb.on_geocode_complete(10, 0);
    }
}
