//! Plain text passthrough.

use crate::output::Extracted;

/// Decode as UTF-8, replacing invalid sequences.
pub fn convert_text(data: &[u8]) -> Extracted {
    Extracted::text(String::from_utf8_lossy(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_bytes_are_replaced() {
        let out = convert_text(b"caf\xff ok");
        assert_eq!(out.text, "caf\u{fffd} ok");
        assert!(out.meta.is_none());
    }
}
