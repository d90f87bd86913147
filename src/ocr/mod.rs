//! Text recognition for raster images.
//!
//! A [`TextRecognizer`] turns one decoded image into text. Two backends ship
//! with the crate:
//!
//! * [`VisionRecognizer`] sends the image to a vision-capable LLM through
//!   `edgequake-llm`.
//! * [`TesseractRecognizer`] shells out to the `tesseract` binary.
//!
//! Both image inputs (`image/png`, `image/jpeg`, ...) and scanned PDF pages go
//! through [`recognize_image`], so cleanup and logging are identical for the
//! two paths.

pub mod encode;
pub mod tesseract;
pub mod vision;

pub use tesseract::TesseractRecognizer;
pub use vision::VisionRecognizer;

use crate::error::Doc2TextError;
use crate::postprocess::clean_recognized_text;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Recognises the text in one raster image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short backend name used in logs and error messages.
    fn name(&self) -> &str;

    /// Return the raw text found in `image`. An image without text yields
    /// an empty string, not an error.
    async fn recognize(&self, image: &DynamicImage) -> Result<String, Doc2TextError>;
}

/// Run `recognizer` over `image` and clean its output.
pub async fn recognize_image(
    recognizer: &Arc<dyn TextRecognizer>,
    image: &DynamicImage,
) -> Result<String, Doc2TextError> {
    let start = Instant::now();
    let raw = recognizer.recognize(image).await?;
    let text = clean_recognized_text(&raw);
    debug!(
        "{}: {}x{} image → {} chars in {:?}",
        recognizer.name(),
        image.width(),
        image.height(),
        text.len(),
        start.elapsed()
    );
    Ok(text)
}
