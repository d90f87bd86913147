//! CLI binary for edgequake-doc2text.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2text::{
    mime_type_by_extension, ArchiveMetadata, ConversionConfig, ConversionRequest,
    ConversionResponse, Dispatcher, OcrProgressCallback, ProgressCallback, TesseractRecognizer,
    TextRecognizer, VisionRecognizer,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Recognition progress using indicatif ─────────────────────────────────────

/// Progress bar for the scanned-page fallback. Stays hidden until a
/// document actually needs recognition.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: ProgressBar::hidden(),
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_ocr_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Recognising");
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.println(format!(
            "{} scanned content found, recognising {total_pages} pages…",
            cyan("◆")
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_recognized(&self, page_num: usize, total: usize, chars: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_ocr_complete(&self, total_pages: usize, recognized: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {recognized}/{total_pages} pages recognised", green("✔"));
        } else {
            eprintln!(
                "{} {recognized}/{total_pages} pages recognised  ({} failed)",
                cyan("⚠"),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain text of a Word document
  doc2text report.docx

  # Full response record as JSON
  doc2text --json slides.pptx > slides.json

  # Whole page instead of the main article
  doc2text --no-readability page.html

  # Scanned PDF, recognised by a vision model
  doc2text --ocr vision --provider openai --model gpt-4.1-nano scan.pdf

  # Scanned PDF, recognised by tesseract, pages in order
  doc2text --ocr tesseract --tesseract-lang deu --preserve-page-order scan.pdf

  # From stdin
  cat notes.rtf | doc2text --mime application/rtf -

SUPPORTED INPUTS:
  .doc .docx .pptx .odt .pages .xls .xlsx .pdf .rtf .html .htm .xhtml
  .xml .txt .jpg .jpeg .png .tif .tiff .zip
  Anything else is sniffed from its leading bytes.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (vision recognition)
  EDGEQUAKE_LLM_PROVIDER  Vision provider when --provider is not given
  EDGEQUAKE_MODEL         Vision model when --model is not given
  PDFIUM_LIB_PATH         Directory holding libpdfium
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Extract plain text from documents.
#[derive(Parser, Debug)]
#[command(
    name = "doc2text",
    version,
    about = "Extract plain text from PDF, Office, ODF, RTF, HTML, image and zip documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document path, or `-` for stdin (requires --mime).
    input: String,

    /// MIME type of the input; default is resolved from the file extension.
    #[arg(long, env = "DOC2TEXT_MIME")]
    mime: Option<String>,

    /// Render whole HTML pages instead of the main content block.
    #[arg(long, env = "DOC2TEXT_NO_READABILITY")]
    no_readability: bool,

    /// Print the JSON response record instead of the text.
    #[arg(long, env = "DOC2TEXT_JSON")]
    json: bool,

    /// Recognizer for images and scanned PDF pages.
    #[arg(long, env = "DOC2TEXT_OCR", value_enum, default_value = "none")]
    ocr: OcrArg,

    /// Vision LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Vision LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    #[arg(long, env = "DOC2TEXT_TESSERACT_LANG", default_value = "eng")]
    tesseract_lang: String,

    /// Pages recognised at once. Default: CPU count.
    #[arg(long, env = "DOC2TEXT_OCR_CONCURRENCY")]
    ocr_concurrency: Option<usize>,

    /// Per-page render + recognition timeout in milliseconds.
    #[arg(long, env = "DOC2TEXT_OCR_TIMEOUT_MS", default_value_t = 120_000)]
    ocr_timeout_ms: u64,

    /// Emit recognised pages in page order.
    #[arg(long, env = "DOC2TEXT_PRESERVE_PAGE_ORDER")]
    preserve_page_order: bool,

    /// Archive entries converted before truncating.
    #[arg(long, env = "DOC2TEXT_MAX_ENTRIES", default_value_t = 10)]
    max_entries: usize,

    /// Largest archive entry converted, in bytes.
    #[arg(long, env = "DOC2TEXT_MAX_ENTRY_BYTES", default_value_t = 5 * 1024 * 1024)]
    max_entry_bytes: u64,

    /// Keep every archive entry's metadata under `<entry>/<key>`.
    #[arg(long, env = "DOC2TEXT_NAMESPACED_ARCHIVE_META")]
    namespaced_archive_meta: bool,

    /// Directory holding libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2TEXT_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2TEXT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OcrArg {
    None,
    Vision,
    Tesseract,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn OcrProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let dispatcher = Dispatcher::new(config);

    let request = read_request(&cli).await?;
    match dispatcher.convert(request).await {
        Ok(response) => print_response(&cli, &response),
        Err(err) if cli.json => {
            let failed = ConversionResponse::failed(&err);
            println!(
                "{}",
                serde_json::to_string_pretty(&failed).context("Failed to serialise response")?
            );
            std::process::exit(1);
        }
        Err(err) => Err(err).context("Conversion failed"),
    }
}

async fn read_request(cli: &Cli) -> Result<ConversionRequest> {
    let readability = !cli.no_readability;
    if cli.input == "-" {
        let mime = cli
            .mime
            .clone()
            .context("Reading stdin requires --mime")?;
        return ConversionRequest::from_reader(tokio::io::stdin(), mime, readability)
            .await
            .context("Failed to read stdin");
    }

    let mime = cli
        .mime
        .clone()
        .unwrap_or_else(|| mime_type_by_extension(&cli.input).to_string());
    let data = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {:?}", cli.input))?;
    Ok(ConversionRequest::new(data, mime).with_readability(readability))
}

fn print_response(cli: &Cli, response: &ConversionResponse) -> Result<()> {
    if cli.json {
        let json =
            serde_json::to_string_pretty(response).context("Failed to serialise response")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(response.body.as_bytes())
        .context("Failed to write to stdout")?;
    if !response.body.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet {
        for skip in &response.skipped {
            eprintln!("  {} {}", cyan("⚠"), dim(&skip.to_string()));
        }
        eprintln!(
            "{} {} chars in {}ms",
            green("✔"),
            response.body.chars().count(),
            response.msecs
        );
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .max_archive_entries(cli.max_entries)
        .max_entry_bytes(cli.max_entry_bytes)
        .ocr_page_timeout_ms(cli.ocr_timeout_ms)
        .preserve_page_order(cli.preserve_page_order);

    if cli.namespaced_archive_meta {
        builder = builder.archive_metadata(ArchiveMetadata::Namespaced);
    }
    if let Some(n) = cli.ocr_concurrency {
        builder = builder.ocr_concurrency(n);
    }
    if let Some(ref dir) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(dir.clone());
    }
    if let Some(recognizer) = build_recognizer(cli)? {
        builder = builder.recognizer(recognizer);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_recognizer(cli: &Cli) -> Result<Option<Arc<dyn TextRecognizer>>> {
    let recognizer: Arc<dyn TextRecognizer> = match cli.ocr {
        OcrArg::None => return Ok(None),
        OcrArg::Tesseract => Arc::new(TesseractRecognizer::new(cli.tesseract_lang.clone())),
        OcrArg::Vision => Arc::new(
            VisionRecognizer::from_env(cli.provider.as_deref(), cli.model.as_deref())
                .context("Failed to configure vision recognizer")?,
        ),
    };
    Ok(Some(recognizer))
}
