//! Raster images (`image/png`, `image/jpeg`, `image/tiff`) through the
//! configured text recognizer.

use crate::config::ConversionConfig;
use crate::error::Doc2TextError;
use crate::ocr::recognize_image;
use crate::output::{Extracted, Metadata};

pub async fn convert_image(
    data: &[u8],
    config: &ConversionConfig,
) -> Result<Extracted, Doc2TextError> {
    let recognizer = config
        .recognizer
        .as_ref()
        .ok_or(Doc2TextError::RecognizerUnavailable)?;

    let owned = data.to_vec();
    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&owned))
        .await
        .map_err(|e| Doc2TextError::Internal(format!("image decode task panicked: {e}")))?
        .map_err(|e| Doc2TextError::Malformed {
            format: "image",
            detail: e.to_string(),
        })?;

    let text = recognize_image(recognizer, &image).await?;

    let mut meta = Metadata::new();
    meta.insert("width".to_string(), image.width().to_string());
    meta.insert("height".to_string(), image.height().to_string());
    Ok(Extracted::text(text).with_meta(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::encode::to_png;
    use crate::ocr::TextRecognizer;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::Arc;

    struct Fixed;

    #[async_trait]
    impl TextRecognizer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, image: &DynamicImage) -> Result<String, Doc2TextError> {
            Ok(format!("## scanned {}px\n", image.width()))
        }
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])));
        to_png(&img).unwrap()
    }

    #[tokio::test]
    async fn image_text_and_dimensions() {
        let config = ConversionConfig::builder()
            .recognizer(Arc::new(Fixed))
            .build()
            .unwrap();
        let out = convert_image(&png(12, 7), &config).await.unwrap();
        assert_eq!(out.text, "scanned 12px");
        let meta = out.meta.unwrap();
        assert_eq!(meta["width"], "12");
        assert_eq!(meta["height"], "7");
    }

    #[tokio::test]
    async fn no_recognizer_is_an_error() {
        let err = convert_image(&png(2, 2), &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2TextError::RecognizerUnavailable));
    }

    #[tokio::test]
    async fn undecodable_bytes_are_malformed() {
        let config = ConversionConfig::builder()
            .recognizer(Arc::new(Fixed))
            .build()
            .unwrap();
        let err = convert_image(b"not an image", &config).await.unwrap_err();
        assert!(matches!(err, Doc2TextError::Malformed { format: "image", .. }));
    }
}
