//! PDF extraction.
//!
//! ```text
//! bytes ──▶ LocalFile ──▶ open + text pass ──▶ image probe ──▶ [fallback] ──▶ Extracted
//! ```
//!
//! 1. The payload is written to a temporary `.pdf` that lives until the
//!    extraction returns.
//! 2. Every page's text layer is read in index order. A page whose text
//!    cannot be read is skipped.
//! 3. The first `image_probe_pages` pages are checked for image objects.
//! 4. Without images the text layer is the result. With images every page
//!    also goes through the [`fallback`] pool and its text is appended.
//!    Fallback failures never fail the extraction.
//!
//! Metadata always carries `num_pages`, plus whatever document information
//! the engine exposes.

pub mod backend;
pub mod fallback;
pub mod pdfium;

pub use backend::{PdfBackend, PdfDocument};
pub use pdfium::PdfiumBackend;

use crate::config::ConversionConfig;
use crate::error::{Doc2TextError, Skipped};
use crate::input::LocalFile;
use crate::output::{Extracted, Metadata};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct TextPass {
    doc: Arc<dyn PdfDocument>,
    texts: Vec<Result<String, String>>,
    probes: Vec<Result<bool, String>>,
    info: Metadata,
}

/// Extract the text of a PDF payload.
pub async fn extract_pdf(
    data: &[u8],
    backend: &Arc<dyn PdfBackend>,
    config: &ConversionConfig,
) -> Result<Extracted, Doc2TextError> {
    // Must outlive the fallback: engines may reopen the file per page.
    let local = LocalFile::new(data, ".pdf")?;
    let path = local.path().to_path_buf();
    let backend = Arc::clone(backend);
    let probe_pages = config.image_probe_pages;

    let pass = tokio::task::spawn_blocking(move || -> Result<TextPass, Doc2TextError> {
        let doc = backend.open(&path)?;
        let texts = doc.page_texts();
        let probes = doc.probe_images(probe_pages);
        let info = doc.info();
        Ok(TextPass {
            doc,
            texts,
            probes,
            info,
        })
    })
    .await
    .map_err(|e| Doc2TextError::Internal(format!("PDF task panicked: {e}")))??;

    let num_pages = pass.doc.page_count();
    let mut skipped = Vec::new();

    let mut pages = Vec::with_capacity(pass.texts.len());
    for (index, text) in pass.texts.into_iter().enumerate() {
        match text {
            Ok(text) => pages.push(text),
            Err(detail) => {
                warn!("Page {}: text extraction failed: {}", index + 1, detail);
                skipped.push(Skipped::PageText { index, detail });
            }
        }
    }
    let mut text = pages.join(" ");

    let mut has_images = false;
    for (index, probe) in pass.probes.into_iter().enumerate() {
        match probe {
            Ok(found) => has_images |= found,
            Err(detail) => {
                warn!("Page {}: image probe failed: {}", index + 1, detail);
                skipped.push(Skipped::ImageProbe { index, detail });
            }
        }
    }

    let mut meta = pass.info;
    meta.insert("num_pages".to_string(), num_pages.to_string());

    if !has_images {
        debug!("No images in the first {} pages; text layer only", probe_pages);
        return Ok(Extracted {
            text,
            meta: Some(meta),
            skipped,
        });
    }

    info!("Images found; running image fallback over {} pages", num_pages);
    match fallback::recognize_pages(pass.doc, config).await {
        Ok(recovered) => {
            if !recovered.text.is_empty() {
                text = format!("{text} {}", recovered.text);
            }
            skipped.extend(recovered.skipped);
        }
        Err(e) => {
            warn!("Image fallback abandoned: {e}");
            skipped.push(Skipped::Fallback {
                detail: e.to_string(),
            });
        }
    }

    drop(local);
    Ok(Extracted {
        text,
        meta: Some(meta),
        skipped,
    })
}
