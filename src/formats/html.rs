//! HTML to text, with an optional readability pass.
//!
//! Text is rendered by walking the DOM: `script`, `style` and similar
//! subtrees are dropped, inline whitespace collapses to single spaces and
//! block elements start new lines.
//!
//! With readability on, the densest content container is rendered instead
//! of the whole body. Candidates (`article`, `main`, `section`, `div`) score
//! their text length minus twice their link text, with bonuses for
//! `article`/`main` and a penalty for link-heavy blocks; containers whose
//! class or id reads like navigation or chrome are never picked.

use super::norm_ws;
use crate::error::Doc2TextError;
use crate::output::{Extracted, Metadata};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "svg", "iframe", "object",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

const BOILERPLATE_MARKERS: &[&str] = &[
    "nav", "navbar", "menu", "sidebar", "footer", "header", "banner", "cookie", "consent", "ads",
    "advert", "promo", "subscribe", "newsletter", "comment",
];

/// Minimum text length for a readability candidate.
const MIN_CANDIDATE_CHARS: usize = 20;

static CANDIDATES: Lazy<Selector> = Lazy::new(|| selector("article, main, section, div"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

pub fn convert_html(data: &[u8], readability: bool) -> Result<Extracted, Doc2TextError> {
    Ok(html_to_extracted(&String::from_utf8_lossy(data), readability))
}

/// Render already-decoded HTML.
pub fn html_to_extracted(html: &str, readability: bool) -> Extracted {
    let doc = Html::parse_document(html);

    let main = if readability { pick_main(&doc) } else { None };
    let root = main
        .or_else(|| doc.select(&BODY).next())
        .unwrap_or_else(|| doc.root_element());

    let mut raw = String::new();
    render(root, &mut raw);
    let text = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut extracted = Extracted::text(text);
    let meta = page_meta(&doc);
    if !meta.is_empty() {
        extracted.meta = Some(meta);
    }
    extracted
}

/// One step of an explicit-stack DOM walk.
enum Walk<N> {
    Enter(N),
    Leave(N),
}

fn render(root: ElementRef<'_>, out: &mut String) {
    let mut stack: Vec<_> = root.children().rev().map(Walk::Enter).collect();
    while let Some(step) = stack.pop() {
        match step {
            Walk::Enter(node) => match node.value() {
                Node::Text(text) => push_inline(out, text),
                Node::Element(element) => {
                    let name = element.name();
                    if SKIPPED_ELEMENTS.contains(&name) {
                        continue;
                    }
                    if name == "br" {
                        out.push('\n');
                        continue;
                    }
                    if BLOCK_ELEMENTS.contains(&name) {
                        out.push('\n');
                    }
                    stack.push(Walk::Leave(node));
                    stack.extend(node.children().rev().map(Walk::Enter));
                }
                _ => {}
            },
            Walk::Leave(node) => {
                if let Node::Element(element) = node.value() {
                    let name = element.name();
                    if BLOCK_ELEMENTS.contains(&name) {
                        out.push('\n');
                    } else if matches!(name, "td" | "th") {
                        out.push(' ');
                    }
                }
            }
        }
    }
}

/// Append text with whitespace runs collapsed to one space.
fn push_inline(out: &mut String, text: &str) {
    let mut words = text.split_whitespace().peekable();
    if words.peek().is_none() {
        if !text.is_empty() && !out.ends_with([' ', '\n']) && !out.is_empty() {
            out.push(' ');
        }
        return;
    }
    if text.starts_with(char::is_whitespace) && !out.ends_with([' ', '\n']) && !out.is_empty() {
        out.push(' ');
    }
    let mut first = true;
    for word in words {
        if !first {
            out.push(' ');
        }
        out.push_str(word);
        first = false;
    }
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn class_or_id_lc(el: &ElementRef<'_>) -> String {
    let mut out = String::new();
    if let Some(c) = el.value().attr("class") {
        out.push_str(c);
        out.push(' ');
    }
    if let Some(i) = el.value().attr("id") {
        out.push_str(i);
    }
    out.to_ascii_lowercase()
}

fn is_boilerplate(el: &ElementRef<'_>) -> bool {
    let s = class_or_id_lc(el);
    !s.is_empty() && BOILERPLATE_MARKERS.iter().any(|bad| s.contains(bad))
}

fn pick_main(doc: &Html) -> Option<ElementRef<'_>> {
    // (text chars, link text chars) of every subtree, summed bottom-up.
    let mut sizes: HashMap<_, (usize, usize)> = HashMap::new();
    let mut stack = vec![Walk::Enter(doc.tree.root())];
    while let Some(step) = stack.pop() {
        match step {
            Walk::Enter(node) => {
                stack.push(Walk::Leave(node));
                stack.extend(node.children().map(Walk::Enter));
            }
            Walk::Leave(node) => {
                let (mut chars, mut links) = match node.value() {
                    Node::Text(text) => (text.trim().chars().count(), 0),
                    _ => (0, 0),
                };
                for child in node.children() {
                    if let Some(&(c, l)) = sizes.get(&child.id()) {
                        chars += c;
                        links += l;
                    }
                }
                if matches!(node.value(), Node::Element(e) if e.name() == "a") {
                    links = chars;
                }
                sizes.insert(node.id(), (chars, links));
            }
        }
    }

    let mut best: Option<(i64, ElementRef<'_>)> = None;
    for el in doc.select(&CANDIDATES) {
        if is_boilerplate(&el) {
            continue;
        }
        let Some(&(chars, links)) = sizes.get(&el.id()) else {
            continue;
        };
        if chars < MIN_CANDIDATE_CHARS {
            continue;
        }
        let mut score = chars as i64 - 2 * links as i64;
        match el.value().name() {
            "article" => score += 500,
            "main" => score += 300,
            _ => {}
        }
        if links > chars / 2 {
            score -= 500;
        }
        if best.as_ref().map_or(score > 0, |(top, _)| score > *top) {
            best = Some((score, el));
        }
    }
    best.map(|(_, el)| el)
}

fn page_meta(doc: &Html) -> Metadata {
    let mut meta = Metadata::new();
    if let Some(title) = doc.select(&TITLE).next() {
        let title = norm_ws(&title.text().collect::<String>());
        if !title.is_empty() {
            meta.insert("title".to_string(), title);
        }
    }
    if let Some(desc) = doc
        .select(&DESCRIPTION)
        .next()
        .and_then(|m| m.value().attr("content"))
    {
        let desc = norm_ws(desc);
        if !desc.is_empty() {
            meta.insert("description".to_string(), desc);
        }
    }
    meta
}
