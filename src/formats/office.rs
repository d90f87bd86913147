//! Zip-packaged office documents: DOCX, PPTX, ODT, legacy Word and Apple
//! Pages.

use super::{attr, open_zip, read_part, read_part_bytes, walk_xml, Node, MAX_PART_BYTES};
use crate::error::{Doc2TextError, Skipped};
use crate::mime;
use crate::output::{Extracted, Metadata};
use std::io::Cursor;
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Longest space run a single `text:s` expands to.
const MAX_SPACE_RUN: usize = 1024;

// ── DOCX ─────────────────────────────────────────────────────────────────────

/// Extract the body text of a Word 2007+ document.
pub fn convert_docx(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    let mut archive = open_zip(data, "docx")?;
    let xml = read_part(&mut archive, "word/document.xml", "docx")?.ok_or_else(|| {
        Doc2TextError::Malformed {
            format: "docx",
            detail: "word/document.xml is missing".into(),
        }
    })?;
    let text = docx_body(&xml)?;
    Ok(Extracted::text(text).with_meta(core_properties(&mut archive)?))
}

fn docx_body(xml: &str) -> Result<String, Doc2TextError> {
    let mut out = String::new();
    let mut in_run_text = false;
    // `w:tab` inside `w:tabs` is a tab-stop definition, not a tab character.
    let mut in_tab_stops = false;
    walk_xml(xml, "docx", |node| match node {
        Node::Start(e) => match e.local_name().as_ref() {
            b"t" => in_run_text = true,
            b"tabs" => in_tab_stops = true,
            _ => {}
        },
        Node::End(name) => match name {
            b"t" => in_run_text = false,
            b"tabs" => in_tab_stops = false,
            b"p" => out.push('\n'),
            _ => {}
        },
        Node::Empty(e) => match e.local_name().as_ref() {
            b"tab" if !in_tab_stops => out.push('\t'),
            b"br" | b"cr" => out.push('\n'),
            _ => {}
        },
        Node::Text(t) if in_run_text => out.push_str(t),
        Node::Text(_) => {}
    })?;
    Ok(out)
}

/// `docProps/core.xml` fields shared by every OOXML package.
fn core_properties(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<Metadata, Doc2TextError> {
    let Some(xml) = read_part(archive, "docProps/core.xml", "ooxml")? else {
        return Ok(Metadata::new());
    };
    read_fields(
        &xml,
        "ooxml",
        &[
            ("title", "title"),
            ("creator", "author"),
            ("subject", "subject"),
            ("description", "description"),
            ("created", "created"),
            ("modified", "modified"),
        ],
    )
}

/// Collect the text of simple `<elem>value</elem>` fields. The first
/// non-empty occurrence of a key wins.
fn read_fields(
    xml: &str,
    format: &'static str,
    fields: &[(&str, &'static str)],
) -> Result<Metadata, Doc2TextError> {
    let mut meta = Metadata::new();
    let mut current: Option<&'static str> = None;
    let mut value = String::new();
    walk_xml(xml, format, |node| match node {
        Node::Start(e) => {
            current = fields
                .iter()
                .find(|(local, _)| e.local_name().as_ref() == local.as_bytes())
                .map(|(_, key)| *key);
            value.clear();
        }
        Node::Text(t) if current.is_some() => value.push_str(t),
        Node::End(_) => {
            if let Some(key) = current.take() {
                let v = value.trim();
                if !v.is_empty() && !meta.contains_key(key) {
                    meta.insert(key.to_string(), v.to_string());
                }
            }
        }
        _ => {}
    })?;
    Ok(meta)
}

// ── PPTX ─────────────────────────────────────────────────────────────────────

/// Extract slide text from a PowerPoint 2007+ presentation, in slide order.
pub fn convert_pptx(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    let mut archive = open_zip(data, "pptx")?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in &slides {
        if let Some(xml) = read_part(&mut archive, name, "pptx")? {
            texts.push(pptx_slide(&xml)?.trim().to_string());
        }
    }

    let mut meta = core_properties(&mut archive)?;
    meta.insert("slides".to_string(), slides.len().to_string());
    Ok(Extracted::text(texts.join("\n\n")).with_meta(meta))
}

/// `ppt/slides/slide12.xml` → 12.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn pptx_slide(xml: &str) -> Result<String, Doc2TextError> {
    let mut out = String::new();
    let mut in_run_text = false;
    walk_xml(xml, "pptx", |node| match node {
        Node::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
        Node::End(b"t") => in_run_text = false,
        Node::End(b"p") => out.push('\n'),
        Node::Empty(e) if e.local_name().as_ref() == b"br" => out.push('\n'),
        Node::Text(t) if in_run_text => out.push_str(t),
        _ => {}
    })?;
    Ok(out)
}

// ── ODT ──────────────────────────────────────────────────────────────────────

/// Extract paragraphs and headings from an OpenDocument text file.
pub fn convert_odt(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    let mut archive = open_zip(data, "odt")?;
    let xml = read_part(&mut archive, "content.xml", "odt")?.ok_or_else(|| {
        Doc2TextError::Malformed {
            format: "odt",
            detail: "content.xml is missing".into(),
        }
    })?;
    let text = odt_body(&xml)?;

    let meta = match read_part(&mut archive, "meta.xml", "odt")? {
        Some(meta_xml) => odt_meta(&meta_xml)?,
        None => Metadata::new(),
    };
    Ok(Extracted::text(text).with_meta(meta))
}

fn odt_body(xml: &str) -> Result<String, Doc2TextError> {
    let mut out = String::new();
    let mut depth = 0usize;
    walk_xml(xml, "odt", |node| match node {
        Node::Start(e) if matches!(e.local_name().as_ref(), b"p" | b"h") => depth += 1,
        Node::End(b"p" | b"h") => {
            depth = depth.saturating_sub(1);
            out.push('\n');
        }
        Node::Empty(e) if depth > 0 => match e.local_name().as_ref() {
            b"s" => {
                let n = attr(e, b"c")
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(1usize)
                    .min(MAX_SPACE_RUN);
                out.extend(std::iter::repeat(' ').take(n));
            }
            b"tab" => out.push('\t'),
            b"line-break" => out.push('\n'),
            _ => {}
        },
        Node::Text(t) if depth > 0 => out.push_str(t),
        _ => {}
    })?;
    Ok(out)
}

fn odt_meta(xml: &str) -> Result<Metadata, Doc2TextError> {
    read_fields(
        xml,
        "odt",
        &[
            ("title", "title"),
            ("initial-creator", "author"),
            ("creator", "author"),
            ("creation-date", "created"),
            ("date", "modified"),
        ],
    )
}

// ── Legacy Word ──────────────────────────────────────────────────────────────

/// `application/msword`: OOXML payloads mislabelled as `.doc` are converted
/// as DOCX; binary Word documents yield nothing.
pub fn convert_msword(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    if data.starts_with(ZIP_MAGIC) {
        return convert_docx(data);
    }
    Ok(Extracted::skipped(Skipped::NoConverter {
        mime_type: mime::MSWORD.to_string(),
    }))
}

// ── Apple Pages ──────────────────────────────────────────────────────────────

/// Pull the QuickLook preview PDF out of a Pages package.
pub fn pages_preview(data: &[u8]) -> Result<Vec<u8>, Doc2TextError> {
    let mut archive = open_zip(data, "pages")?;
    let name = archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with("quicklook/preview.pdf"))
        .map(str::to_string)
        .ok_or_else(|| Doc2TextError::Malformed {
            format: "pages",
            detail: "no QuickLook/Preview.pdf in package".into(),
        })?;

    read_part_bytes(&mut archive, &name, "pages", MAX_PART_BYTES)?.ok_or_else(|| {
        Doc2TextError::Malformed {
            format: "pages",
            detail: format!("{name}: unreadable"),
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) fn zip_of(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const DOCX_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
      <w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve">world &amp; co</w:t></w:r></w:p>
    <w:p><w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
    xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Quarterly report</dc:title>
  <dc:creator>A. Writer</dc:creator>
  <dcterms:created>2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#;

    #[test]
    fn docx_text_and_core_metadata() {
        let data = zip_of(&[
            ("word/document.xml", DOCX_BODY.as_bytes()),
            ("docProps/core.xml", CORE.as_bytes()),
        ]);
        let out = convert_docx(&data).unwrap();
        assert_eq!(out.text, "Hello\tworld & co\nLine one\nLine two\n");
        let meta = out.meta.unwrap();
        assert_eq!(meta["title"], "Quarterly report");
        assert_eq!(meta["author"], "A. Writer");
        assert_eq!(meta["created"], "2024-01-02T03:04:05Z");
        assert!(!meta.contains_key("subject"));
    }

    #[test]
    fn docx_without_body_is_malformed() {
        let data = zip_of(&[("docProps/core.xml", CORE.as_bytes())]);
        assert!(matches!(
            convert_docx(&data),
            Err(Doc2TextError::Malformed { format: "docx", .. })
        ));
    }

    #[test]
    fn docx_from_garbage_is_malformed() {
        assert!(convert_docx(b"definitely not a zip").is_err());
    }

    fn slide(text: &str) -> String {
        format!(
            r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    #[test]
    fn pptx_slides_in_numeric_order() {
        let (s1, s2, s10) = (slide("first"), slide("second"), slide("tenth"));
        let data = zip_of(&[
            ("ppt/slides/slide10.xml", s10.as_bytes()),
            ("ppt/slides/slide2.xml", s2.as_bytes()),
            ("ppt/slides/slide1.xml", s1.as_bytes()),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>".as_bytes()),
        ]);
        let out = convert_pptx(&data).unwrap();
        assert_eq!(out.text, "first\n\nsecond\n\ntenth");
        assert_eq!(out.meta.unwrap()["slides"], "3");
    }

    #[test]
    fn slide_number_parsing() {
        assert_eq!(slide_number("ppt/slides/slide7.xml"), Some(7));
        assert_eq!(slide_number("ppt/slides/_rels/slide7.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn odt_paragraphs_spaces_and_meta() {
        let content = r#"<office:document-content xmlns:office="o" xmlns:text="t">
  <office:body><office:text>
    <text:h text:outline-level="1">Title</text:h>
    <text:p>a<text:s text:c="3"/>b<text:tab/>c<text:line-break/>d <text:span>span</text:span></text:p>
  </office:text></office:body>
</office:document-content>"#;
        let meta = r#"<office:document-meta xmlns:office="o" xmlns:meta="m" xmlns:dc="d">
  <office:meta><dc:title>Doc</dc:title><meta:initial-creator>Ann</meta:initial-creator>
  <dc:creator>Bob</dc:creator><dc:date>2024-05-06T07:08:09</dc:date></office:meta>
</office:document-meta>"#;
        let data = zip_of(&[
            ("content.xml", content.as_bytes()),
            ("meta.xml", meta.as_bytes()),
        ]);
        let out = convert_odt(&data).unwrap();
        assert_eq!(out.text, "Title\na   b\tc\nd span\n");
        let meta = out.meta.unwrap();
        assert_eq!(meta["title"], "Doc");
        assert_eq!(meta["author"], "Ann");
        assert_eq!(meta["modified"], "2024-05-06T07:08:09");
    }

    #[test]
    fn odt_space_runs_are_bounded() {
        let content = r#"<office:document-content xmlns:office="o" xmlns:text="t">
  <office:body><office:text>
    <text:p>a<text:s text:c="1000000000000"/>b<text:s text:c="99999999999999999999999"/>c</text:p>
  </office:text></office:body>
</office:document-content>"#;
        let data = zip_of(&[("content.xml", content.as_bytes())]);
        let out = convert_odt(&data).unwrap();
        assert_eq!(out.text, format!("a{}b c\n", " ".repeat(MAX_SPACE_RUN)));
    }

    #[test]
    fn binary_msword_has_no_converter() {
        let out = convert_msword(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1rest").unwrap();
        assert!(out.text.is_empty());
        assert!(matches!(out.skipped.as_slice(), [Skipped::NoConverter { .. }]));
    }

    #[test]
    fn ooxml_labelled_as_msword_is_converted() {
        let data = zip_of(&[("word/document.xml", DOCX_BODY.as_bytes())]);
        let out = convert_msword(&data).unwrap();
        assert!(out.text.contains("Hello"));
    }

    #[test]
    fn pages_preview_is_found_case_insensitively() {
        let data = zip_of(&[
            ("Index/Document.iwa", "\x00\x01".as_bytes()),
            ("QuickLook/Preview.pdf", "%PDF-1.3 preview".as_bytes()),
        ]);
        assert_eq!(pages_preview(&data).unwrap(), b"%PDF-1.3 preview");
    }

    #[test]
    fn pages_without_preview_is_malformed() {
        let data = zip_of(&[("Index/Document.iwa", "\x00\x01".as_bytes())]);
        assert!(matches!(
            pages_preview(&data),
            Err(Doc2TextError::Malformed { format: "pages", .. })
        ));
    }
}
