//! Progress-callback trait for per-stage extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to follow a
//! run as it moves from text extraction to the model call to the table.
//! The CLI uses it to drive its spinner; a web front-end could forward the
//! same events to a status line.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2csv::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ExtractionProgressCallback for Printer {
//!     fn on_products_parsed(&self, count: usize) {
//!         eprintln!("{count} products found");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Text extraction finished.
    ///
    /// # Arguments
    /// * `page_count` — pages in the document
    /// * `text_chars` — characters of accumulated text
    fn on_text_extracted(&self, page_count: usize, text_chars: usize) {
        let _ = (page_count, text_chars);
    }

    /// A model request is about to be sent.
    ///
    /// # Arguments
    /// * `attempt` — 1 for the first call, 2+ for retries
    fn on_model_request(&self, attempt: u32) {
        let _ = attempt;
    }

    /// The reply was parsed; `count` is 0 when it was unusable.
    fn on_products_parsed(&self, count: usize) {
        let _ = count;
    }

    /// The CSV was written to `path`.
    fn on_table_written(&self, path: &Path, rows: usize, columns: usize) {
        let _ = (path, rows, columns);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        requests: Arc<AtomicUsize>,
        products: Arc<AtomicUsize>,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_model_request(&self, _attempt: u32) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        fn on_products_parsed(&self, count: usize) {
            self.products.store(count, Ordering::SeqCst);
        }
    }

    #[test]
    fn overridden_methods_fire() {
        let requests = Arc::new(AtomicUsize::new(0));
        let products = Arc::new(AtomicUsize::new(0));
        let cb: ProgressCallback = Arc::new(TrackingCallback {
            requests: Arc::clone(&requests),
            products: Arc::clone(&products),
        });

        cb.on_text_extracted(2, 100);
        cb.on_model_request(1);
        cb.on_model_request(2);
        cb.on_products_parsed(3);
        cb.on_table_written(Path::new("out.csv"), 3, 7);

        assert_eq!(requests.load(Ordering::SeqCst), 2);
        assert_eq!(products.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn noop_callback_is_object_safe() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_text_extracted(0, 0);
        cb.on_products_parsed(0);
    }
}
