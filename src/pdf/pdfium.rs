//! [`PdfBackend`] implementation on top of pdfium via `pdfium-render`.
//!
//! ## Serialised access
//!
//! pdfium keeps global library state and is not safe to drive from several
//! threads at once. Every call binds, opens the document and works on it
//! while holding one process-wide lock, so concurrent fallback tasks queue
//! for the engine and overlap only in the recognition step.
//!
//! ## Rendering size
//!
//! Pages render with their longest edge capped at `max_pixels`, whatever
//! their physical size.

use super::backend::{PdfBackend, PdfDocument};
use crate::error::Doc2TextError;
use crate::output::Metadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

/// Opens PDFs with libpdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Bind to libpdfium in `library_path`, or, when `None`, the directory in
    /// `PDFIUM_LIB_PATH`, the working directory and then the system library path.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

fn bind(library_path: Option<&Path>) -> Result<Pdfium, Doc2TextError> {
    let from_env = std::env::var_os("PDFIUM_LIB_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let bindings = match library_path.or(from_env.as_deref()) {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Doc2TextError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Run `f` on a freshly opened document while holding the engine lock.
fn with_document<T>(
    library_path: Option<&Path>,
    path: &Path,
    f: impl FnOnce(&pdfium_render::prelude::PdfDocument<'_>) -> T,
) -> Result<T, Doc2TextError> {
    let _guard = PDFIUM_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let pdfium = bind(library_path)?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| Doc2TextError::OpenFailed {
            format: "pdf",
            detail: format!("{e:?}"),
        })?;
    Ok(f(&document))
}

impl PdfBackend for PdfiumBackend {
    fn open(&self, path: &Path) -> Result<Arc<dyn PdfDocument>, Doc2TextError> {
        let (page_count, info) = with_document(self.library_path.as_deref(), path, |doc| {
            (doc.pages().len() as usize, document_info(doc))
        })?;
        info!("PDF loaded: {} pages", page_count);
        Ok(Arc::new(PdfiumDocument {
            path: path.to_path_buf(),
            library_path: self.library_path.clone(),
            page_count,
            info,
        }))
    }
}

fn document_info(doc: &pdfium_render::prelude::PdfDocument<'_>) -> Metadata {
    let metadata = doc.metadata();
    let tags = [
        ("title", PdfDocumentMetadataTagType::Title),
        ("author", PdfDocumentMetadataTagType::Author),
        ("subject", PdfDocumentMetadataTagType::Subject),
        ("creator", PdfDocumentMetadataTagType::Creator),
        ("producer", PdfDocumentMetadataTagType::Producer),
        ("created", PdfDocumentMetadataTagType::CreationDate),
        ("modified", PdfDocumentMetadataTagType::ModificationDate),
    ];
    tags.into_iter()
        .filter_map(|(key, tag)| {
            let value = metadata.get(tag)?.value().trim().to_string();
            (!value.is_empty()).then(|| (key.to_string(), value))
        })
        .collect()
}

fn page_index(index: usize) -> Result<u16, String> {
    u16::try_from(index).map_err(|_| format!("page index {index} out of range"))
}

/// A PDF on disk; reopened for every operation.
struct PdfiumDocument {
    path: PathBuf,
    library_path: Option<PathBuf>,
    page_count: usize,
    info: Metadata,
}

impl PdfiumDocument {
    fn run<T>(
        &self,
        f: impl FnOnce(&pdfium_render::prelude::PdfDocument<'_>) -> Result<T, String>,
    ) -> Result<T, String> {
        with_document(self.library_path.as_deref(), &self.path, f).map_err(|e| e.to_string())?
    }
}

fn text_of(page: &PdfPage<'_>) -> Result<String, String> {
    page.text().map(|t| t.all()).map_err(|e| format!("{e:?}"))
}

fn has_images(page: &PdfPage<'_>) -> bool {
    page.objects()
        .iter()
        .any(|object| object.object_type() == PdfPageObjectType::Image)
}

impl PdfDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        self.run(|doc| {
            let page = doc.pages().get(page_index(index)?).map_err(|e| format!("{e:?}"))?;
            text_of(&page)
        })
    }

    fn page_has_images(&self, index: usize) -> Result<bool, String> {
        self.run(|doc| {
            let page = doc.pages().get(page_index(index)?).map_err(|e| format!("{e:?}"))?;
            Ok(has_images(&page))
        })
    }

    fn render_page(&self, index: usize, max_pixels: u32) -> Result<DynamicImage, String> {
        self.run(|doc| {
            let page = doc.pages().get(page_index(index)?).map_err(|e| format!("{e:?}"))?;
            let render_config = PdfRenderConfig::new()
                .set_target_width(max_pixels as i32)
                .set_maximum_height(max_pixels as i32);
            let image = page
                .render_with_config(&render_config)
                .map_err(|e| format!("{e:?}"))?
                .as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            Ok(image)
        })
    }

    fn info(&self) -> Metadata {
        self.info.clone()
    }

    fn page_texts(&self) -> Vec<Result<String, String>> {
        let opened = with_document(self.library_path.as_deref(), &self.path, |doc| {
            doc.pages().iter().map(|page| text_of(&page)).collect::<Vec<_>>()
        });
        match opened {
            Ok(texts) => texts,
            Err(e) => {
                let reason = e.to_string();
                (0..self.page_count).map(|_| Err(reason.clone())).collect()
            }
        }
    }

    fn probe_images(&self, count: usize) -> Vec<Result<bool, String>> {
        let count = count.min(self.page_count);
        let opened = with_document(self.library_path.as_deref(), &self.path, |doc| {
            doc.pages()
                .iter()
                .take(count)
                .map(|page| Ok(has_images(&page)))
                .collect::<Vec<_>>()
        });
        match opened {
            Ok(probes) => probes,
            Err(e) => {
                let reason = e.to_string();
                (0..count).map(|_| Err(reason.clone())).collect()
            }
        }
    }
}
