//! Text recognition with the `tesseract` command-line tool.
//!
//! The image is written to a temporary PNG and recognised with
//! `tesseract <png> stdout -l <lang>`; the text is read from stdout.

use super::encode::to_png;
use super::TextRecognizer;
use crate::error::Doc2TextError;
use crate::escape::shell_join;
use async_trait::async_trait;
use image::DynamicImage;
use std::io::Write;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Recognises text by running the Tesseract OCR engine.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl TesseractRecognizer {
    /// Use `tesseract` from `PATH` with the given language pack (e.g. `"eng"`,
    /// `"deu+eng"`).
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: language.into(),
        }
    }

    /// Run a specific tesseract executable instead of the one on `PATH`.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn failure(&self, detail: impl Into<String>) -> Doc2TextError {
        Doc2TextError::RecognitionFailed {
            recognizer: self.name().to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<String, Doc2TextError> {
        let png = to_png(image).map_err(|e| self.failure(format!("PNG encoding failed: {e}")))?;

        let mut input = tempfile::Builder::new()
            .prefix("doc2text-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| self.failure(format!("temp file: {e}")))?;
        input
            .write_all(&png)
            .and_then(|_| input.flush())
            .map_err(|e| self.failure(format!("temp file: {e}")))?;

        let args = [
            input.path().to_string_lossy().into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
        ];
        debug!(
            "Running {}",
            shell_join(std::iter::once(self.binary.to_string_lossy().into_owned()).chain(args.clone()))
        );

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.failure(format!("could not run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("exited with {}: {}", output.status, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
