//! POSIX shell quoting for logged command lines.

use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_SHELL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w@%+=:,./-]").expect("static regex is valid"));

/// Quote `s` so a POSIX shell reads it back as one literal word.
///
/// Empty input becomes `''`. Input made only of word characters and
/// `@%+=:,./-` is returned unchanged. Anything else is wrapped in single
/// quotes, with embedded single quotes written as `'"'"'`.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if !UNSAFE_SHELL_CHAR.is_match(s) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}

/// Render a program and its arguments as one copy-pasteable command line.
pub fn shell_join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| shell_escape(p.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_quoted() {
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn safe_strings_pass_through() {
        for s in ["abc", "/tmp/page-1.png", "user@host:8080", "a+b=c,d%", "eng"] {
            assert_eq!(shell_escape(s), s);
        }
    }

    #[test]
    fn unsafe_strings_are_single_quoted() {
        assert_eq!(shell_escape("hello world"), "'hello world'");
        assert_eq!(shell_escape("$HOME"), "'$HOME'");
        assert_eq!(shell_escape("a;rm -rf /"), "'a;rm -rf /'");
    }

    #[test]
    fn embedded_single_quotes_are_escaped() {
        assert_eq!(shell_escape("it's"), r#"'it'"'"'s'"#);
    }

    #[test]
    fn join_escapes_each_part() {
        assert_eq!(
            shell_join(["tesseract", "/tmp/my scan.png", "stdout"]),
            "tesseract '/tmp/my scan.png' stdout"
        );
    }
}
