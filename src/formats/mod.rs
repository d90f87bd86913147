//! Per-format converters.
//!
//! Every converter takes the raw payload and returns an [`Extracted`]; the
//! dispatcher wraps any error into `ConversionFailed` with the MIME type.
//! All of them except [`image`] are synchronous and run on the blocking pool.
//!
//! [`Extracted`]: crate::output::Extracted

pub mod html;
pub mod image;
pub mod office;
pub mod rtf;
pub mod sheet;
pub mod text;
pub mod xml;

use crate::error::Doc2TextError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Open a zip-based document container.
pub(crate) fn open_zip<'a>(
    data: &'a [u8],
    format: &'static str,
) -> Result<ZipArchive<Cursor<&'a [u8]>>, Doc2TextError> {
    ZipArchive::new(Cursor::new(data)).map_err(|e| Doc2TextError::Malformed {
        format,
        detail: format!("not a zip container: {e}"),
    })
}

/// Largest single zip part a converter inflates.
pub(crate) const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Upper bound on buffer preallocation from a declared size.
const PREALLOC_BYTES: u64 = 8 * 1024 * 1024;

/// Read at most `limit` bytes from `reader`. `None` when it holds more.
///
/// `declared` only sizes the initial buffer; it is never trusted as a bound.
pub(crate) fn read_capped(
    reader: impl Read,
    declared: u64,
    limit: u64,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::with_capacity(declared.min(limit).min(PREALLOC_BYTES) as usize);
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)?;
    Ok((bytes.len() as u64 <= limit).then_some(bytes))
}

/// Read one part of a zip container, refusing parts over `limit` bytes.
/// A missing part is `None`.
pub(crate) fn read_part_bytes(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: &'static str,
    limit: u64,
) -> Result<Option<Vec<u8>>, Doc2TextError> {
    let malformed = |detail: String| Doc2TextError::Malformed {
        format,
        detail: format!("{name}: {detail}"),
    };
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(malformed(e.to_string())),
    };
    let declared = file.size();
    if declared > limit {
        return Err(malformed(format!("declares {declared} bytes, over the {limit} byte limit")));
    }
    read_capped(file, declared, limit)
        .map_err(|e| malformed(e.to_string()))?
        .map(Some)
        .ok_or_else(|| malformed(format!("inflates past the {limit} byte limit")))
}

/// Read one part of a zip container as UTF-8 text. A missing part is `None`.
pub(crate) fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: &'static str,
) -> Result<Option<String>, Doc2TextError> {
    Ok(read_part_bytes(archive, name, format, MAX_PART_BYTES)?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// One XML event, reduced to what the text walkers need.
pub(crate) enum Node<'a> {
    Start(&'a BytesStart<'a>),
    Empty(&'a BytesStart<'a>),
    /// Local name of the closed element.
    End(&'a [u8]),
    Text(&'a str),
}

/// Stream `xml` through `visit`. Text and CDATA arrive unescaped.
pub(crate) fn walk_xml(
    xml: &str,
    format: &'static str,
    mut visit: impl FnMut(Node<'_>),
) -> Result<(), Doc2TextError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => visit(Node::Start(&e)),
            Ok(Event::Empty(e)) => visit(Node::Empty(&e)),
            Ok(Event::End(e)) => visit(Node::End(e.local_name().as_ref())),
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                visit(Node::Text(&text));
            }
            Ok(Event::CData(e)) => visit(Node::Text(&String::from_utf8_lossy(&e))),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Doc2TextError::Malformed {
                    format,
                    detail: format!(
                        "XML error at position {}: {e}",
                        reader.buffer_position()
                    ),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Value of the attribute whose local name is `local`.
pub(crate) fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
