//! Progress-callback trait for the PDF image fallback.
//!
//! Inject an [`Arc<dyn OcrProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while scanned pages are rendered and recognised. Text-layer
//! extraction is fast and reports nothing; recognition is the slow part.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2text::{ConversionConfig, OcrProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl OcrProgressCallback for Counter {
//!     fn on_page_recognized(&self, _page: usize, _total: usize, _chars: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the image fallback as it processes each page.
///
/// Pages are recognised concurrently, so every method may be called from
/// several threads at once and pages complete out of order. All methods
/// default to no-ops. Page numbers are 1-indexed.
pub trait OcrProgressCallback: Send + Sync {
    /// Called once before the first page is rendered.
    fn on_ocr_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page's render starts.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page was recognised; `chars` is the text length in bytes.
    fn on_page_recognized(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called when a page failed or timed out and was dropped.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_ocr_complete(&self, total_pages: usize, recognized: usize) {
        let _ = (total_pages, recognized);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl OcrProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn OcrProgressCallback>;
