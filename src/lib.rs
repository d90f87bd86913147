//! # edgequake-doc2text
//!
//! Extract plain text and metadata from office documents, PDFs, web pages,
//! images and zip archives.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + claimed MIME type
//!  │
//!  ├─ 1. Route     exact match on the MIME type, else sniff the leading bytes
//!  ├─ 2. Convert   DOCX / PPTX / ODT / XLS(X) / RTF / HTML / XML / text
//!  │               PDF      text layer, image fallback for scanned pages
//!  │               image    vision LLM or tesseract
//!  │               zip      every entry back through step 1
//!  └─ 3. Respond   trimmed body + metadata + elapsed ms + skipped items
//! ```
//!
//! Conversion is best-effort: a page or archive entry that fails is recorded
//! in [`ConversionResponse::skipped`] and the rest of the document is still
//! returned. Only payloads that cannot be opened at all are errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2text::{convert_path, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let response = convert_path("report.docx", &config).await?;
//!     println!("{}", response.body);
//!     for skip in &response.skipped {
//!         eprintln!("skipped: {skip}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Scanned PDFs and image inputs need a recognizer:
//!
//! ```rust,no_run
//! use edgequake_doc2text::{ConversionConfig, VisionRecognizer};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let recognizer = VisionRecognizer::from_env(None, None)?;
//! let config = ConversionConfig::builder()
//!     .recognizer(Arc::new(recognizer))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2text` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doc2text = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

mod archive;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod escape;
pub mod formats;
pub mod input;
pub mod mime;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod postprocess;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArchiveMetadata, ConversionConfig, ConversionConfigBuilder};
pub use dispatch::{
    convert, convert_path, convert_path_readability, convert_sync, ConversionRequest, Dispatcher,
};
pub use error::{Doc2TextError, Skipped};
pub use mime::{detect_content_type, mime_type_by_extension};
pub use ocr::{TesseractRecognizer, TextRecognizer, VisionRecognizer};
pub use output::{ConversionResponse, Extracted, Metadata};
pub use pdf::{PdfBackend, PdfDocument, PdfiumBackend};
pub use progress::{NoopProgressCallback, OcrProgressCallback, ProgressCallback};
