//! Image encoding: `DynamicImage` → PNG bytes, and PNG → base64 `ImageData`
//! for vision models.
//!
//! PNG is lossless; JPEG artefacts around glyph edges cost recognition
//! accuracy on rendered text.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG bytes.
pub fn to_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode an image as a base64 PNG attachment.
///
/// `detail: "high"` lets tiling models look at the full-resolution image;
/// the low-detail overview loses small print.
pub fn to_image_data(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let b64 = STANDARD.encode(to_png(img)?);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
