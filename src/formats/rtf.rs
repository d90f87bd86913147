//! Rich Text Format.
//!
//! A single-pass tokenizer over control words, control symbols, groups and
//! plain text. Destinations that never hold body text (font and colour
//! tables, stylesheets, document info, pictures, headers and footers, and
//! any `{\*...}` group) are skipped as a whole.

use crate::error::Doc2TextError;
use crate::output::Extracted;

const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "fldinst",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "filetbl",
    "revtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
];

#[derive(Clone, Copy)]
struct Group {
    skip: bool,
    /// Fallback characters following each `\uN`.
    uc: usize,
}

pub fn convert_rtf(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if !data[start..].starts_with(b"{\\rtf") {
        return Err(Doc2TextError::Malformed {
            format: "rtf",
            detail: "missing {\\rtf header".into(),
        });
    }
    Ok(Extracted::text(rtf_to_text(&data[start..])))
}

fn rtf_to_text(data: &[u8]) -> String {
    let mut out = String::new();
    let mut stack: Vec<Group> = Vec::new();
    let mut group = Group { skip: false, uc: 1 };
    // Fallback characters still to drop after a `\uN`.
    let mut pending = 0usize;
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'{' => {
                stack.push(group);
                pending = 0;
                i += 1;
            }
            b'}' => {
                if let Some(outer) = stack.pop() {
                    group = outer;
                }
                pending = 0;
                i += 1;
            }
            b'\\' => {
                i += 1;
                let Some(&next) = data.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let word_start = i;
                    while i < data.len() && data[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word = String::from_utf8_lossy(&data[word_start..i]).into_owned();

                    let param_start = i;
                    if i < data.len() && data[i] == b'-' {
                        i += 1;
                    }
                    while i < data.len() && data[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i64> = std::str::from_utf8(&data[param_start..i])
                        .ok()
                        .and_then(|s| s.parse().ok());
                    if i < data.len() && data[i] == b' ' {
                        i += 1;
                    }

                    match word.as_str() {
                        "bin" => {
                            let n = param.unwrap_or(0).max(0) as usize;
                            i = (i + n).min(data.len());
                        }
                        "uc" => group.uc = param.unwrap_or(1).max(0) as usize,
                        "u" => {
                            if let Some(n) = param {
                                let code = if n < 0 { n + 65536 } else { n };
                                if let Some(c) = u32::try_from(code).ok().and_then(char::from_u32) {
                                    if !group.skip {
                                        out.push(c);
                                    }
                                }
                                pending = group.uc;
                            }
                        }
                        w if SKIPPED_DESTINATIONS.contains(&w) => group.skip = true,
                        "par" | "line" | "sect" | "page" | "row" => {
                            emit(&mut out, &mut pending, group.skip, '\n')
                        }
                        "tab" | "cell" => emit(&mut out, &mut pending, group.skip, '\t'),
                        "emdash" => emit(&mut out, &mut pending, group.skip, '\u{2014}'),
                        "endash" => emit(&mut out, &mut pending, group.skip, '\u{2013}'),
                        "bullet" => emit(&mut out, &mut pending, group.skip, '\u{2022}'),
                        "lquote" | "rquote" => emit(&mut out, &mut pending, group.skip, '\''),
                        "ldblquote" | "rdblquote" => emit(&mut out, &mut pending, group.skip, '"'),
                        _ => {}
                    }
                } else {
                    i += 1;
                    match next {
                        b'*' => group.skip = true,
                        b'\'' => {
                            let hex = data.get(i..i + 2).and_then(|h| std::str::from_utf8(h).ok());
                            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                                emit(&mut out, &mut pending, group.skip, char::from(byte));
                                i += 2;
                            }
                        }
                        b'\\' | b'{' | b'}' => emit(&mut out, &mut pending, group.skip, char::from(next)),
                        b'~' => emit(&mut out, &mut pending, group.skip, ' '),
                        b'_' => emit(&mut out, &mut pending, group.skip, '-'),
                        b'\n' | b'\r' => emit(&mut out, &mut pending, group.skip, '\n'),
                        _ => {}
                    }
                }
            }
            b'\r' | b'\n' => i += 1,
            _ => {
                emit(&mut out, &mut pending, group.skip, char::from(b));
                i += 1;
            }
        }
    }
    out
}

/// Append one output character, unless it is a `\uN` fallback being dropped.
fn emit(out: &mut String, pending: &mut usize, skip: bool, c: char) {
    if *pending > 0 {
        *pending -= 1;
    } else if !skip {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(rtf: &str) -> String {
        convert_rtf(rtf.as_bytes()).unwrap().text
    }

    #[test]
    fn paragraphs_and_tabs() {
        let rtf = r"{\rtf1\ansi\deff0 {\fonttbl {\f0 Times New Roman;}}
{\colortbl;\red0\green0\blue0;}
\f0\fs24 Hello, \b world\b0 !\par
Second\tab line\par
}";
        assert_eq!(text(rtf), "Hello, world!\nSecond\tline\n");
    }

    #[test]
    fn ignorable_destinations_are_skipped() {
        let rtf = r"{\rtf1{\*\generator Riched20;}{\info{\title Secret}}Body\par}";
        assert_eq!(text(rtf), "Body\n");
    }

    #[test]
    fn hex_escapes_and_unicode() {
        assert_eq!(text(r"{\rtf1 caf\'e9}"), "caf\u{e9}");
        assert_eq!(text(r"{\rtf1\uc1 \u8364?5}"), "\u{20ac}5");
        assert_eq!(text(r"{\rtf1 \u-3913?}"), "\u{f0b7}");
    }

    #[test]
    fn escaped_symbols() {
        assert_eq!(text(r"{\rtf1 a\{b\}c\\d}"), r"a{b}c\d");
    }

    #[test]
    fn non_rtf_is_malformed() {
        assert!(matches!(
            convert_rtf(b"plain text"),
            Err(Doc2TextError::Malformed { format: "rtf", .. })
        ));
    }
}
