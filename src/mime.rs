//! MIME resolution: filename extension → MIME type, content sniffing, and the
//! exact-match routing table the dispatcher branches on.

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const TEXT_XML: &str = "text/xml";
pub const APPLICATION_PDF: &str = "application/pdf";
pub const APPLICATION_ZIP: &str = "application/zip";
pub const MSWORD: &str = "application/msword";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const XLS: &str = "application/vnd.ms-excel";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const ODT: &str = "application/vnd.oasis.opendocument.text";
pub const PAGES: &str = "application/vnd.apple.pages";
pub const RTF: &str = "application/rtf";

/// Map a filename to a MIME type by its last extension, case-insensitively.
///
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn mime_type_by_extension(name: &str) -> &'static str {
    match extension(name).to_ascii_lowercase().as_str() {
        "doc" => MSWORD,
        "docx" => DOCX,
        "odt" => ODT,
        "pages" => PAGES,
        "pdf" => APPLICATION_PDF,
        "pptx" => PPTX,
        "rtf" => RTF,
        "xml" => TEXT_XML,
        "xhtml" | "html" | "htm" => TEXT_HTML,
        "jpg" | "jpeg" | "jpe" | "jfif" | "jfif-tbnl" => "image/jpeg",
        "png" => "image/png",
        "tif" => "image/tif",
        "tiff" => "image/tiff",
        "txt" => TEXT_PLAIN,
        "xls" => XLS,
        "xlsx" => XLSX,
        "zip" | "7z" | "rar" => APPLICATION_ZIP,
        _ => OCTET_STREAM,
    }
}

/// Text after the last `.` of the final `/`-separated component, or "".
fn extension(name: &str) -> &str {
    let file = name.rsplit('/').next().unwrap_or(name);
    match file.rfind('.') {
        Some(dot) => &file[dot + 1..],
        None => "",
    }
}

/// The conversion strategy chosen for an exact MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Word,
    Docx,
    Pptx,
    Spreadsheet,
    Odt,
    Pages,
    Pdf,
    Rtf,
    Html,
    Url,
    Xml,
    Image,
    Archive,
    PlainText,
}

impl Route {
    /// Exact-match lookup; `None` means the payload must be sniffed.
    pub fn for_mime(mime_type: &str) -> Option<Route> {
        let route = match mime_type {
            "application/msword" | "application/vnd.ms-word" => Route::Word,
            DOCX => Route::Docx,
            PPTX => Route::Pptx,
            XLS | XLSX => Route::Spreadsheet,
            ODT => Route::Odt,
            PAGES | "application/x-iwork-pages-sffpages" => Route::Pages,
            APPLICATION_PDF => Route::Pdf,
            "application/rtf" | "application/x-rtf" | "text/rtf" | "text/richtext" => Route::Rtf,
            TEXT_HTML => Route::Html,
            "text/url" => Route::Url,
            TEXT_XML | "application/xml" => Route::Xml,
            "image/jpeg" | "image/png" | "image/tif" | "image/tiff" => Route::Image,
            APPLICATION_ZIP => Route::Archive,
            TEXT_PLAIN => Route::PlainText,
            _ => return None,
        };
        Some(route)
    }
}

/// Number of leading bytes the text heuristics look at.
const SNIFF_LEN: usize = 512;

const HTML_SIGNATURES: &[&[u8]] = &[
    b"<!doctype html",
    b"<html",
    b"<head",
    b"<script",
    b"<iframe",
    b"<h1",
    b"<div",
    b"<font",
    b"<table",
    b"<a",
    b"<style",
    b"<title",
    b"<b",
    b"<body",
    b"<br",
    b"<p",
    b"<!--",
];

/// Infer a payload's MIME type from its leading bytes.
///
/// Never returns parameters such as `; charset=utf-8`, so the result can be
/// fed straight back into [`Route::for_mime`].
pub fn detect_content_type(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return TEXT_PLAIN;
    }
    let window = &data[..data.len().min(SNIFF_LEN)];
    let start = window
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(window.len());
    let head = &window[start..];

    if HTML_SIGNATURES.iter().any(|sig| matches_tag(head, sig)) {
        return TEXT_HTML;
    }
    if head.starts_with(b"<?xml") {
        return TEXT_XML;
    }
    if data.starts_with(b"%PDF-") {
        return APPLICATION_PDF;
    }
    if let Some(kind) = infer::get(data) {
        return kind.mime_type();
    }
    if window.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

/// Case-insensitive prefix match that also requires a tag terminator.
fn matches_tag(head: &[u8], sig: &[u8]) -> bool {
    if head.len() <= sig.len() || !head[..sig.len()].eq_ignore_ascii_case(sig) {
        return false;
    }
    sig == b"<!--" || matches!(head[sig.len()], b' ' | b'>')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
