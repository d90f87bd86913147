//! The PDF engine seam.
//!
//! The extractor only needs four things from a PDF engine: the page count,
//! per-page text, whether a page carries raster images, and a rendered
//! bitmap of a page. Everything behind [`PdfBackend`] is blocking; the
//! extractor always calls it from `spawn_blocking`.

use crate::error::Doc2TextError;
use crate::output::Metadata;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;

/// Opens PDF files.
pub trait PdfBackend: Send + Sync {
    /// Open the document at `path`. A failure here is structural and aborts
    /// the extraction.
    fn open(&self, path: &Path) -> Result<Arc<dyn PdfDocument>, Doc2TextError>;
}

/// An opened, read-only PDF document.
///
/// Page-level methods return `Err(String)` with a human-readable reason;
/// the extractor turns those into skipped pages. Implementations must
/// tolerate `render_page` being called from several threads at once.
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Text layer of one page (0-based).
    fn page_text(&self, index: usize) -> Result<String, String>;

    /// Whether one page (0-based) contains an image object.
    fn page_has_images(&self, index: usize) -> Result<bool, String>;

    /// Rasterise one page (0-based) with its longest edge capped at `max_pixels`.
    fn render_page(&self, index: usize, max_pixels: u32) -> Result<DynamicImage, String>;

    /// Document information dictionary entries (title, author, ...).
    fn info(&self) -> Metadata {
        Metadata::new()
    }

    /// Text of every page in index order.
    fn page_texts(&self) -> Vec<Result<String, String>> {
        (0..self.page_count()).map(|i| self.page_text(i)).collect()
    }

    /// Image probe results for the first `count` pages.
    fn probe_images(&self, count: usize) -> Vec<Result<bool, String>> {
        (0..count.min(self.page_count()))
            .map(|i| self.page_has_images(i))
            .collect()
    }
}
