//! Error types for the edgequake-doc2text library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`Doc2TextError`] is **fatal**: the conversion cannot produce a result
//!   at all (absent input, the container or PDF cannot be opened, a format
//!   parser rejected the payload). Returned as `Err(Doc2TextError)` from the
//!   `convert*` entry points.
//!
//! * [`Skipped`] is **non-fatal**: one page, one archive entry or the image
//!   fallback failed, and the aggregate result was produced without it.
//!   Skips are collected in [`crate::output::Extracted::skipped`] and copied
//!   to [`crate::output::ConversionResponse::skipped`] so callers can count
//!   partial failures instead of losing them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2text library.
#[derive(Debug, Error)]
pub enum Doc2TextError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No data source was supplied.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading an input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Structural errors ─────────────────────────────────────────────────
    /// The archive or PDF engine could not open the payload at all.
    #[error("Could not open {format} document: {detail}")]
    OpenFailed { format: &'static str, detail: String },

    /// A converter opened the payload but its content is not what the format requires.
    #[error("Malformed {format} content: {detail}")]
    Malformed { format: &'static str, detail: String },

    /// A converter failed; `source` holds the underlying cause.
    #[error("Conversion of '{mime_type}' failed: {source}")]
    ConversionFailed {
        mime_type: String,
        #[source]
        source: Box<Doc2TextError>,
    },

    /// Content sniffing kept producing new, unroutable types.
    #[error(
        "Content claimed as '{claimed}' was detected as '{detected}' after {hops} re-detection hop(s); giving up"
    )]
    DetectionUnstable {
        claimed: String,
        detected: String,
        hops: u8,
    },

    // ── Recognition errors ────────────────────────────────────────────────
    /// An image needs recognising but no [`crate::ocr::TextRecognizer`] is configured.
    #[error("No text recognizer is configured.\nUse --ocr vision or --ocr tesseract, or set ConversionConfig::recognizer.")]
    RecognizerUnavailable,

    /// The recognizer ran and failed.
    #[error("Text recognition failed ({recognizer}): {detail}")]
    RecognitionFailed { recognizer: String, detail: String },

    /// No vision LLM provider could be configured.
    #[error(
        "Vision provider '{provider}' is not configured: {hint}\n\
Set OPENAI_API_KEY (or another provider key), or pass --provider and --model."
    )]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Network errors ────────────────────────────────────────────────────
    /// A `text/url` document could not be fetched.
    #[error("Failed to fetch '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// A `text/url` fetch exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide,\n\
or set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A response could not be serialised.
    #[error("Failed to serialise response: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2TextError {
    /// Wrap a converter failure, keeping an existing `ConversionFailed` as is.
    pub(crate) fn into_conversion_failed(self, mime_type: &str) -> Self {
        match self {
            e @ Doc2TextError::ConversionFailed { .. } => e,
            e => Doc2TextError::ConversionFailed {
                mime_type: mime_type.to_string(),
                source: Box::new(e),
            },
        }
    }

    /// The innermost error behind any `ConversionFailed` wrapping.
    pub fn root_cause(&self) -> &Doc2TextError {
        match self {
            Doc2TextError::ConversionFailed { source, .. } => source.root_cause(),
            e => e,
        }
    }

    /// Whether the container or document could not be opened at all.
    pub fn is_open_failure(&self) -> bool {
        matches!(self.root_cause(), Doc2TextError::OpenFailed { .. })
    }
}

/// A non-fatal failure absorbed by best-effort extraction.
///
/// Page indexes are zero-based; messages print them one-based.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Skipped {
    /// The text layer of one PDF page could not be read.
    #[error("Page {}: text extraction failed: {detail}", .index + 1)]
    PageText { index: usize, detail: String },

    /// Image detection failed on one sampled page.
    #[error("Page {}: image probe failed: {detail}", .index + 1)]
    ImageProbe { index: usize, detail: String },

    /// Rendering or recognising one page in the image fallback failed.
    #[error("Page {}: image fallback failed: {detail}", .index + 1)]
    PageImage { index: usize, detail: String },

    /// Rendering plus recognition of one page exceeded the per-page timeout.
    #[error("Page {}: image fallback timed out after {millis}ms", .index + 1)]
    PageTimeout { index: usize, millis: u64 },

    /// The whole image fallback was abandoned; the text layer was kept.
    #[error("Image fallback abandoned: {detail}")]
    Fallback { detail: String },

    /// One archive entry failed to convert or produced no text.
    #[error("Entry '{name}': {reason}")]
    Entry { name: String, reason: String },

    /// One archive entry exceeded the per-entry size ceiling.
    #[error("Entry '{name}' is {size} bytes, over the {limit}-byte ceiling")]
    EntryTooLarge { name: String, size: u64, limit: u64 },

    /// The archive had more entries than the entry ceiling allows.
    #[error("Archive truncated after {limit} entries")]
    EntryLimit { limit: usize },

    /// A nested container was not opened because it is too deep.
    #[error("'{name}' not opened: nesting depth {depth} exceeds the limit")]
    NestingLimit { name: String, depth: u8 },

    /// The payload's type is known but has no converter.
    #[error("No converter for '{mime_type}'")]
    NoConverter { mime_type: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failed_is_not_double_wrapped() {
        let inner = Doc2TextError::OpenFailed {
            format: "archive",
            detail: "bad central directory".into(),
        };
        let once = inner.into_conversion_failed("application/zip");
        let twice = once.into_conversion_failed("text/plain");
        match &twice {
            Doc2TextError::ConversionFailed { mime_type, source } => {
                assert_eq!(mime_type, "application/zip");
                assert!(matches!(**source, Doc2TextError::OpenFailed { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(twice.is_open_failure());
    }

    #[test]
    fn conversion_failed_display_carries_cause() {
        let e = Doc2TextError::Malformed {
            format: "rtf",
            detail: "unbalanced group".into(),
        }
        .into_conversion_failed("application/rtf");
        let msg = e.to_string();
        assert!(msg.contains("application/rtf"), "got: {msg}");
        assert!(msg.contains("unbalanced group"), "got: {msg}");
        assert!(!e.is_open_failure());
    }

    #[test]
    fn skipped_pages_print_one_based() {
        let s = Skipped::PageTimeout {
            index: 0,
            millis: 500,
        };
        assert!(s.to_string().starts_with("Page 1:"), "got: {s}");
    }

    #[test]
    fn skipped_serialises_with_kind_tag() {
        let s = Skipped::EntryLimit { limit: 10 };
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"kind":"entry_limit","limit":10}"#);
    }

    #[test]
    fn detection_unstable_display() {
        let e = Doc2TextError::DetectionUnstable {
            claimed: "foo/bar".into(),
            detected: "application/zip".into(),
            hops: 1,
        };
        let msg = e.to_string();
        assert!(msg.contains("foo/bar") && msg.contains("application/zip"));
    }
}
