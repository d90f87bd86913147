//! Post-processing: deterministic cleanup of recognised page text.
//!
//! Every recogniser's output goes through [`clean_recognized_text`]: code
//! fences, stray line endings, invisible characters and blank-line runs are
//! removed without touching the words. Vision models also tend to answer in
//! Markdown; [`strip_markdown`] removes heading markers and image links and
//! is applied to their output only.
//!
//! Rules run in order: fences first so the later passes see the inner text,
//! line endings before any per-line pass, blank-line collapsing last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply the shared cleanup rules to a recogniser's raw output.
///
/// 1. Strip an outer code fence
/// 2. Normalise line endings (CRLF, CR, form feed → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of blank lines to one blank line
/// 6. Trim the whole result
pub fn clean_recognized_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Drop Markdown image links (keeping their alt text) and leading `#`
/// heading markers.
pub fn strip_markdown(input: &str) -> String {
    drop_heading_markers(&drop_image_links(input))
}

// ── Rule 1: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*?)\r?\n```\s*$").expect("static regex is valid")
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Markdown: image links ─────────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("static regex is valid"));

fn drop_image_links(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| caps[1].trim().to_string())
        .to_string()
}

// ── Markdown: heading markers ─────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("static regex is valid"));

fn drop_heading_markers(input: &str) -> String {
    RE_HEADING.replace_all(input, "").to_string()
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex is valid"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_and_without_language() {
        assert_eq!(strip_outer_fence("```text\nhello\nworld\n```"), "hello\nworld");
        assert_eq!(strip_outer_fence("```\nhello\n```"), "hello");
        assert_eq!(strip_outer_fence("no fence"), "no fence");
    }

    #[test]
    fn normalises_line_endings_and_form_feeds() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn image_links_keep_alt_text() {
        assert_eq!(drop_image_links("see ![Figure 2](fig.png) above"), "see Figure 2 above");
        assert_eq!(drop_image_links("![](x.png)"), "");
    }

    #[test]
    fn heading_markers_are_removed_but_hashes_in_text_survive() {
        assert_eq!(drop_heading_markers("# Title\nissue #42"), "Title\nissue #42");
        assert_eq!(drop_heading_markers("  ### Deep"), "Deep");
    }

    #[test]
    fn invisible_characters_are_removed() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn blank_line_runs_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn full_pipeline() {
        let raw = "```markdown\r\n# Invoice 17   \r\n\r\n\r\n\r\nTotal: 12.00\u{200B}\r\n```\n";
        let cleaned = clean_recognized_text(raw);
        assert_eq!(cleaned, "# Invoice 17\n\nTotal: 12.00");
        assert_eq!(strip_markdown(&cleaned), "Invoice 17\n\nTotal: 12.00");
    }

    #[test]
    fn shared_cleanup_keeps_leading_hashes() {
        assert_eq!(clean_recognized_text("# 1 priority\n![x](y)"), "# 1 priority\n![x](y)");
    }

    #[test]
    fn empty_and_whitespace_only_become_empty() {
        assert_eq!(clean_recognized_text(""), "");
        assert_eq!(clean_recognized_text(" \n\u{000C}\n "), "");
    }
}
