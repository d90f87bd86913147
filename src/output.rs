//! Output types: the per-converter [`Extracted`] value and the caller-facing
//! [`ConversionResponse`] record.

use crate::error::{Doc2TextError, Skipped};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Metadata key → value. Keys are unique; ordering carries no meaning.
pub type Metadata = BTreeMap<String, String>;

/// What a single converter produced.
///
/// `text` is untrimmed; the dispatcher trims once when building the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub meta: Option<Metadata>,
    pub skipped: Vec<Skipped>,
}

impl Extracted {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = Some(meta);
        self
    }

    /// An empty successful result that records why nothing was extracted.
    pub fn skipped(reason: Skipped) -> Self {
        Self {
            skipped: vec![reason],
            ..Default::default()
        }
    }
}

/// Response record sent back to the requestor.
///
/// A non-empty `error` marks a terminal failure; `body` and `meta` of such a
/// response carry nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionResponse {
    /// Extracted text with surrounding whitespace trimmed.
    pub body: String,
    /// Optional metadata; serialised as `null` when absent.
    #[serde(default)]
    pub meta: Option<Metadata>,
    /// Elapsed conversion time in whole milliseconds.
    pub msecs: u32,
    /// Empty on success.
    #[serde(default)]
    pub error: String,
    /// Items dropped by best-effort extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Skipped>,
}

impl ConversionResponse {
    /// Build a successful response from a converter result.
    pub fn from_extracted(extracted: Extracted, elapsed: Duration) -> Self {
        Self {
            body: extracted.text.trim().to_string(),
            meta: extracted.meta,
            msecs: elapsed_msecs(elapsed),
            error: String::new(),
            skipped: extracted.skipped,
        }
    }

    /// Build the error-shaped response for a failed conversion.
    pub fn failed(err: &Doc2TextError) -> Self {
        Self {
            error: err.to_string(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

fn elapsed_msecs(elapsed: Duration) -> u32 {
    u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_trims_body_and_keeps_meta() {
        let mut meta = Metadata::new();
        meta.insert("num_pages".into(), "3".into());
        let extracted = Extracted::text("\n  hello world \t\n").with_meta(meta.clone());

        let resp = ConversionResponse::from_extracted(extracted, Duration::from_millis(42));
        assert_eq!(resp.body, "hello world");
        assert_eq!(resp.meta, Some(meta));
        assert_eq!(resp.msecs, 42);
        assert!(resp.is_success());
    }

    #[test]
    fn failed_response_has_error_and_nothing_else() {
        let err = Doc2TextError::InvalidInput {
            reason: "no data source".into(),
        };
        let resp = ConversionResponse::failed(&err);
        assert!(!resp.is_success());
        assert!(resp.body.is_empty());
        assert!(resp.meta.is_none());
    }

    #[test]
    fn json_shape_matches_wire_record() {
        let resp = ConversionResponse::from_extracted(Extracted::text("x"), Duration::ZERO);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "body": "x", "meta": null, "msecs": 0, "error": "" })
        );
    }

    #[test]
    fn huge_elapsed_saturates() {
        assert_eq!(elapsed_msecs(Duration::from_secs(u64::MAX / 2)), u32::MAX);
    }
}
