//! Conversion entry points and MIME-type routing.
//!
//! The [`Dispatcher`] picks a converter by exact match on the claimed MIME
//! type. A claimed type with no converter is sniffed from the payload:
//!
//! * the sniffed type equals the claimed one: an empty successful result
//!   with a `NoConverter` diagnostic;
//! * it differs and the hop budget allows: the payload is dispatched again
//!   under the sniffed type;
//! * it differs with no hops left: `DetectionUnstable`.
//!
//! Containers (zip archives, Pages packages) re-enter the dispatcher for
//! their members with a fresh hop budget and one more level of nesting.

use crate::archive::extract_archive;
use crate::config::ConversionConfig;
use crate::error::{Doc2TextError, Skipped};
use crate::formats::{html, image, office, rtf, sheet, text, xml};
use crate::input::{fetch_url, read_path};
use crate::mime::{detect_content_type, mime_type_by_extension, Route, APPLICATION_PDF};
use crate::output::{ConversionResponse, Extracted};
use crate::pdf::{extract_pdf, PdfBackend, PdfiumBackend};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// One conversion request: payload, claimed type and readability flag.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    /// `None` is rejected with `InvalidInput`.
    pub data: Option<Vec<u8>>,
    pub mime_type: String,
    /// Only the HTML and URL converters look at this.
    pub readability: bool,
}

impl ConversionRequest {
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            mime_type: mime_type.into(),
            readability: true,
        }
    }

    pub fn with_readability(mut self, readability: bool) -> Self {
        self.readability = readability;
        self
    }

    /// Read the whole stream into a request.
    pub async fn from_reader<R: AsyncRead + Unpin>(
        mut reader: R,
        mime_type: impl Into<String>,
        readability: bool,
    ) -> Result<Self, Doc2TextError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|source| Doc2TextError::ReadFailed {
                path: PathBuf::from("-"),
                source,
            })?;
        Ok(Self {
            data: Some(data),
            mime_type: mime_type.into(),
            readability,
        })
    }
}

/// Where a dispatch sits in the recursion: re-detection hops taken and
/// container nesting depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DispatchState {
    hops: u8,
    nesting: u8,
}

impl DispatchState {
    /// State for the members of a container.
    pub(crate) fn nested(self) -> Self {
        Self {
            hops: 0,
            nesting: self.nesting.saturating_add(1),
        }
    }

    fn redetected(self) -> Self {
        Self {
            hops: self.hops.saturating_add(1),
            ..self
        }
    }

    pub(crate) fn nesting(self) -> u8 {
        self.nesting
    }
}

/// Routes payloads to converters. Cheap to share behind an `Arc`.
pub struct Dispatcher {
    config: ConversionConfig,
    pdf_backend: Arc<dyn PdfBackend>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// A dispatcher using pdfium for PDFs.
    pub fn new(config: ConversionConfig) -> Self {
        let pdf_backend: Arc<dyn PdfBackend> =
            Arc::new(PdfiumBackend::new(config.pdfium_library_path.clone()));
        Self {
            config,
            pdf_backend,
        }
    }

    /// Replace the PDF engine.
    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf_backend = backend;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one request.
    ///
    /// # Errors
    /// `InvalidInput` when the request has no data; otherwise only fatal
    /// failures (the payload cannot be opened or parsed at all). Partial
    /// failures are reported in [`ConversionResponse::skipped`].
    pub async fn convert(
        &self,
        request: ConversionRequest,
    ) -> Result<ConversionResponse, Doc2TextError> {
        let Some(data) = request.data else {
            return Err(Doc2TextError::InvalidInput {
                reason: "no data source".into(),
            });
        };
        let start = Instant::now();
        info!(
            "Converting {} bytes claimed as {}",
            data.len(),
            request.mime_type
        );

        let extracted = self
            .dispatch(
                &data,
                &request.mime_type,
                request.readability,
                DispatchState::default(),
            )
            .await?;
        let response = ConversionResponse::from_extracted(extracted, start.elapsed());

        info!(
            "Conversion complete: {} chars, {} skipped, {}ms",
            response.body.len(),
            response.skipped.len(),
            response.msecs
        );
        Ok(response)
    }

    /// Convert a local file, typed by its extension, with readability on.
    pub async fn convert_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ConversionResponse, Doc2TextError> {
        self.convert_path_with(path.as_ref(), true).await
    }

    /// Convert a local file and serialise the response as JSON.
    pub async fn convert_path_readability(
        &self,
        path: impl AsRef<Path>,
        readability: bool,
    ) -> Result<Vec<u8>, Doc2TextError> {
        let response = self.convert_path_with(path.as_ref(), readability).await?;
        Ok(serde_json::to_vec(&response)?)
    }

    async fn convert_path_with(
        &self,
        path: &Path,
        readability: bool,
    ) -> Result<ConversionResponse, Doc2TextError> {
        let mime_type = mime_type_by_extension(&path.to_string_lossy());
        let data = read_path(path).await?;
        self.convert(ConversionRequest::new(data, mime_type).with_readability(readability))
            .await
    }

    /// Route one payload. Boxed because containers recurse through it.
    pub(crate) fn dispatch<'a>(
        &'a self,
        data: &'a [u8],
        mime_type: &'a str,
        readability: bool,
        state: DispatchState,
    ) -> BoxFuture<'a, Result<Extracted, Doc2TextError>> {
        async move {
            let Some(route) = Route::for_mime(mime_type) else {
                return self.redetect(data, mime_type, readability, state).await;
            };
            debug!("{} bytes as {} → {:?}", data.len(), mime_type, route);
            self.run(route, data, readability, state)
                .await
                .map_err(|e| e.into_conversion_failed(mime_type))
        }
        .boxed()
    }

    async fn redetect(
        &self,
        data: &[u8],
        claimed: &str,
        readability: bool,
        state: DispatchState,
    ) -> Result<Extracted, Doc2TextError> {
        let detected = detect_content_type(data);
        if detected == claimed {
            info!("No converter for {}", claimed);
            return Ok(Extracted::skipped(Skipped::NoConverter {
                mime_type: claimed.to_string(),
            }));
        }
        if state.hops >= self.config.max_redetect_hops {
            return Err(Doc2TextError::DetectionUnstable {
                claimed: claimed.to_string(),
                detected: detected.to_string(),
                hops: state.hops,
            });
        }
        warn!(
            "No converter for claimed type {}; content looks like {}",
            claimed, detected
        );
        self.dispatch(data, detected, readability, state.redetected())
            .await
    }

    async fn run(
        &self,
        route: Route,
        data: &[u8],
        readability: bool,
        state: DispatchState,
    ) -> Result<Extracted, Doc2TextError> {
        match route {
            Route::PlainText => Ok(text::convert_text(data)),
            Route::Word => blocking(data, office::convert_msword).await,
            Route::Docx => blocking(data, office::convert_docx).await,
            Route::Pptx => blocking(data, office::convert_pptx).await,
            Route::Odt => blocking(data, office::convert_odt).await,
            Route::Spreadsheet => blocking(data, sheet::convert_spreadsheet).await,
            Route::Rtf => blocking(data, rtf::convert_rtf).await,
            Route::Xml => blocking(data, xml::convert_xml).await,
            Route::Html => {
                blocking(data, move |d| html::convert_html(d, readability)).await
            }
            Route::Url => self.convert_url(data, readability).await,
            Route::Image => image::convert_image(data, &self.config).await,
            Route::Pdf => extract_pdf(data, &self.pdf_backend, &self.config).await,
            Route::Pages => {
                let preview = blocking_map(data, office::pages_preview).await?;
                let inner = state.nested();
                if inner.nesting() > self.config.max_nesting_depth {
                    return Ok(Extracted::skipped(Skipped::NestingLimit {
                        name: "QuickLook/Preview.pdf".into(),
                        depth: inner.nesting(),
                    }));
                }
                self.dispatch(&preview, APPLICATION_PDF, readability, inner)
                    .await
            }
            Route::Archive => extract_archive(self, data, state).await,
        }
    }

    async fn convert_url(&self, data: &[u8], readability: bool) -> Result<Extracted, Doc2TextError> {
        let url = String::from_utf8_lossy(data).trim().to_string();
        let body = fetch_url(&url, self.config.download_timeout_secs).await?;
        let mut extracted = tokio::task::spawn_blocking(move || {
            html::html_to_extracted(&body, readability)
        })
        .await
        .map_err(|e| Doc2TextError::Internal(format!("HTML task panicked: {e}")))?;
        extracted
            .meta
            .get_or_insert_with(Default::default)
            .insert("url".to_string(), url);
        Ok(extracted)
    }
}

/// Run a synchronous converter on the blocking pool.
async fn blocking<F>(data: &[u8], convert: F) -> Result<Extracted, Doc2TextError>
where
    F: FnOnce(&[u8]) -> Result<Extracted, Doc2TextError> + Send + 'static,
{
    blocking_map(data, convert).await
}

async fn blocking_map<T, F>(data: &[u8], f: F) -> Result<T, Doc2TextError>
where
    T: Send + 'static,
    F: FnOnce(&[u8]) -> Result<T, Doc2TextError> + Send + 'static,
{
    let owned = data.to_vec();
    tokio::task::spawn_blocking(move || f(&owned))
        .await
        .map_err(|e| Doc2TextError::Internal(format!("converter task panicked: {e}")))?
}

// ── Free-function entry points ───────────────────────────────────────────

/// Convert a payload with a one-off [`Dispatcher`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_doc2text::{convert, ConversionConfig, ConversionRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ConversionRequest::new(b"hello".to_vec(), "text/plain");
/// let response = convert(request, &ConversionConfig::default()).await?;
/// assert_eq!(response.body, "hello");
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionResponse, Doc2TextError> {
    Dispatcher::new(config.clone()).convert(request).await
}

/// Convert a local file, typed by its extension, with readability on.
pub async fn convert_path(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionResponse, Doc2TextError> {
    Dispatcher::new(config.clone()).convert_path(path).await
}

/// Convert a local file and return the JSON-serialised response.
pub async fn convert_path_readability(
    path: impl AsRef<Path>,
    readability: bool,
    config: &ConversionConfig,
) -> Result<Vec<u8>, Doc2TextError> {
    Dispatcher::new(config.clone())
        .convert_path_readability(path, readability)
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionResponse, Doc2TextError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2TextError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_state_resets_hops() {
        let state = DispatchState::default().redetected().nested();
        assert_eq!(state, DispatchState { hops: 0, nesting: 1 });
        assert_eq!(state.redetected().hops, 1);
    }

    #[tokio::test]
    async fn absent_data_is_invalid_input() {
        let dispatcher = Dispatcher::new(ConversionConfig::default());
        let err = dispatcher
            .convert(ConversionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2TextError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn plain_text_is_trimmed() {
        let dispatcher = Dispatcher::new(ConversionConfig::default());
        let resp = dispatcher
            .convert(ConversionRequest::new(b"  hi there \n".to_vec(), "text/plain"))
            .await
            .unwrap();
        assert_eq!(resp.body, "hi there");
        assert!(resp.meta.is_none());
    }

    #[tokio::test]
    async fn unknown_type_sniffed_as_itself_is_empty_success() {
        let dispatcher = Dispatcher::new(ConversionConfig::default());
        let resp = dispatcher
            .convert(ConversionRequest::new(
                vec![0u8, 1, 2, 3],
                "application/octet-stream",
            ))
            .await
            .unwrap();
        assert!(resp.body.is_empty());
        assert_eq!(
            resp.skipped,
            vec![Skipped::NoConverter {
                mime_type: "application/octet-stream".into()
            }]
        );
    }

    #[tokio::test]
    async fn exhausted_hops_fail_closed() {
        let config = ConversionConfig::builder()
            .max_redetect_hops(0)
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(config);
        let err = dispatcher
            .convert(ConversionRequest::new(b"plain words".to_vec(), "foo/bar"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Doc2TextError::DetectionUnstable { hops: 0, .. }
        ));
    }
}
