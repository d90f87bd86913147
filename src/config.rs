//! Configuration types for document-to-text conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`].

use crate::error::Doc2TextError;
use crate::ocr::TextRecognizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doc2text::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .max_archive_entries(25)
///     .ocr_concurrency(4)
///     .preserve_page_order(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Maximum number of archive entries converted. Default: 10.
    ///
    /// Entries past the ceiling are never read; the archive result is
    /// truncated, not failed.
    pub max_archive_entries: usize,

    /// Per-entry uncompressed size ceiling in bytes. Default: 5 MiB.
    ///
    /// Oversized entries are skipped without being decompressed.
    pub max_entry_bytes: u64,

    /// How entry metadata is folded into the archive's metadata. Default: last entry wins.
    pub archive_metadata: ArchiveMetadata,

    /// How deep containers may nest (zip inside zip, PDF preview inside a
    /// Pages package). Default: 3.
    pub max_nesting_depth: u8,

    /// Leading PDF pages probed for embedded images. Default: 5.
    ///
    /// Scanning every page is expensive and the first pages are
    /// representative for scanned documents.
    pub image_probe_pages: usize,

    /// Maximum pages rendered and recognised at once in the image fallback.
    /// Default: available CPU parallelism.
    pub ocr_concurrency: usize,

    /// Per-page render + recognition timeout in milliseconds. Default: 120 000.
    pub ocr_page_timeout_ms: u64,

    /// Emit fallback text in page order instead of completion order. Default: false.
    pub preserve_page_order: bool,

    /// Content re-detection hops allowed for unroutable MIME types. Default: 1.
    pub max_redetect_hops: u8,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Directory holding libpdfium. `None` tries the working directory, then
    /// the system library path.
    pub pdfium_library_path: Option<PathBuf>,

    /// Timeout for fetching `text/url` documents in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Recogniser used for image inputs and scanned PDF pages.
    /// `None` disables recognition.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// Optional per-page events from the image fallback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_archive_entries: 10,
            max_entry_bytes: 5 * 1024 * 1024,
            archive_metadata: ArchiveMetadata::default(),
            max_nesting_depth: 3,
            image_probe_pages: 5,
            ocr_concurrency: default_concurrency(),
            ocr_page_timeout_ms: 120_000,
            preserve_page_order: false,
            max_redetect_hops: 1,
            max_rendered_pixels: 2000,
            pdfium_library_path: None,
            download_timeout_secs: 30,
            recognizer: None,
            progress_callback: None,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_archive_entries", &self.max_archive_entries)
            .field("max_entry_bytes", &self.max_entry_bytes)
            .field("archive_metadata", &self.archive_metadata)
            .field("max_nesting_depth", &self.max_nesting_depth)
            .field("image_probe_pages", &self.image_probe_pages)
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("ocr_page_timeout_ms", &self.ocr_page_timeout_ms)
            .field("preserve_page_order", &self.preserve_page_order)
            .field("max_redetect_hops", &self.max_redetect_hops)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("recognizer", &self.recognizer.as_ref().map(|r| r.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn OcrProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn max_archive_entries(mut self, n: usize) -> Self {
        self.config.max_archive_entries = n;
        self
    }

    pub fn max_entry_bytes(mut self, n: u64) -> Self {
        self.config.max_entry_bytes = n;
        self
    }

    pub fn archive_metadata(mut self, policy: ArchiveMetadata) -> Self {
        self.config.archive_metadata = policy;
        self
    }

    pub fn max_nesting_depth(mut self, n: u8) -> Self {
        self.config.max_nesting_depth = n;
        self
    }

    pub fn image_probe_pages(mut self, n: usize) -> Self {
        self.config.image_probe_pages = n;
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn ocr_page_timeout_ms(mut self, ms: u64) -> Self {
        self.config.ocr_page_timeout_ms = ms;
        self
    }

    pub fn preserve_page_order(mut self, v: bool) -> Self {
        self.config.preserve_page_order = v;
        self
    }

    pub fn max_redetect_hops(mut self, n: u8) -> Self {
        self.config.max_redetect_hops = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2TextError> {
        let c = &self.config;
        if c.max_archive_entries == 0 {
            return Err(Doc2TextError::InvalidConfig(
                "max_archive_entries must be ≥ 1".into(),
            ));
        }
        if c.max_entry_bytes == 0 {
            return Err(Doc2TextError::InvalidConfig(
                "max_entry_bytes must be ≥ 1".into(),
            ));
        }
        if c.ocr_page_timeout_ms == 0 {
            return Err(Doc2TextError::InvalidConfig(
                "ocr_page_timeout_ms must be ≥ 1".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(Doc2TextError::InvalidConfig(
                "download_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How per-entry metadata becomes the archive's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArchiveMetadata {
    /// The metadata of the last entry that produced text replaces everything
    /// before it. (default)
    #[default]
    LastEntryWins,
    /// Every entry's metadata is kept under `"<entry name>/<key>"`.
    Namespaced,
}

impl ArchiveMetadata {
    /// Fold one entry's metadata into the accumulated archive metadata.
    pub fn fold(
        self,
        acc: Option<crate::output::Metadata>,
        entry_name: &str,
        entry_meta: Option<crate::output::Metadata>,
    ) -> Option<crate::output::Metadata> {
        match self {
            ArchiveMetadata::LastEntryWins => entry_meta,
            ArchiveMetadata::Namespaced => {
                let Some(entry_meta) = entry_meta else {
                    return acc;
                };
                let mut merged = acc.unwrap_or_default();
                for (key, value) in entry_meta {
                    merged.insert(format!("{entry_name}/{key}"), value);
                }
                Some(merged)
            }
        }
    }
}
