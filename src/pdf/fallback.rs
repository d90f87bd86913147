//! Image fallback: render every page and recognise its text.
//!
//! Pages are processed by a bounded pool (`ocr_concurrency` tasks in flight)
//! drawing page indices in order. Each task renders its page on the blocking
//! pool and hands the bitmap to the configured [`TextRecognizer`], under one
//! per-page timeout covering both steps. A page that fails or times out
//! contributes nothing and is reported as a [`Skipped`] entry.
//!
//! Fragments are joined in completion order unless `preserve_page_order` is
//! set, in which case they are sorted by page index after every task has
//! finished.

use super::backend::PdfDocument;
use crate::config::ConversionConfig;
use crate::error::{Doc2TextError, Skipped};
use crate::ocr::recognize_image;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Text recovered by the fallback plus the pages it had to drop.
#[derive(Debug, Default)]
pub struct FallbackText {
    pub text: String,
    pub skipped: Vec<Skipped>,
}

/// Render and recognise every page of `doc`.
///
/// Only a missing recogniser is an error; page failures are collected.
pub async fn recognize_pages(
    doc: Arc<dyn PdfDocument>,
    config: &ConversionConfig,
) -> Result<FallbackText, Doc2TextError> {
    let recognizer = config
        .recognizer
        .clone()
        .ok_or(Doc2TextError::RecognizerUnavailable)?;
    let total = doc.page_count();
    let concurrency = config.ocr_concurrency.max(1);
    let timeout_ms = config.ocr_page_timeout_ms;
    let max_pixels = config.max_rendered_pixels;
    let progress = config.progress_callback.clone();

    info!(
        "Image fallback: {} pages via {} (concurrency {})",
        total,
        recognizer.name(),
        concurrency
    );
    if let Some(cb) = &progress {
        cb.on_ocr_start(total);
    }

    let mut outcomes: Vec<(usize, Result<String, Skipped>)> = stream::iter(0..total)
        .map(|index| {
            let doc = Arc::clone(&doc);
            let recognizer = Arc::clone(&recognizer);
            let progress = progress.clone();
            async move {
                if let Some(cb) = &progress {
                    cb.on_page_start(index + 1, total);
                }

                let work = async {
                    let image = tokio::task::spawn_blocking(move || doc.render_page(index, max_pixels))
                        .await
                        .map_err(|e| format!("render task panicked: {e}"))??;
                    recognize_image(&recognizer, &image)
                        .await
                        .map_err(|e| e.to_string())
                };

                let outcome = match tokio::time::timeout(Duration::from_millis(timeout_ms), work).await {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(detail)) => Err(Skipped::PageImage { index, detail }),
                    Err(_) => Err(Skipped::PageTimeout {
                        index,
                        millis: timeout_ms,
                    }),
                };

                match (&outcome, &progress) {
                    (Ok(text), Some(cb)) => cb.on_page_recognized(index + 1, total, text.len()),
                    (Err(skip), Some(cb)) => cb.on_page_error(index + 1, total, &skip.to_string()),
                    _ => {}
                }
                match &outcome {
                    Ok(text) => debug!("Page {}: recognised {} chars", index + 1, text.len()),
                    Err(skip) => warn!("{skip}"),
                }
                (index, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    if config.preserve_page_order {
        outcomes.sort_by_key(|(index, _)| *index);
    }

    let mut fragments = Vec::new();
    let mut skipped = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Ok(text) if !text.is_empty() => fragments.push(text),
            Ok(_) => {}
            Err(skip) => skipped.push(skip),
        }
    }

    let recognized = total - skipped.len();
    if let Some(cb) = &progress {
        cb.on_ocr_complete(total, recognized);
    }
    info!(
        "Image fallback done: {}/{} pages recognised, {} with text",
        recognized,
        total,
        fragments.len()
    );

    Ok(FallbackText {
        text: fragments.join(" "),
        skipped,
    })
}
