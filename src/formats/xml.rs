//! Generic XML: the document's character data, element structure dropped.

use super::{walk_xml, Node};
use crate::error::Doc2TextError;
use crate::output::Extracted;

/// Text and CDATA nodes, each trimmed, joined by single spaces.
pub fn convert_xml(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    let xml = String::from_utf8_lossy(data);
    let mut parts: Vec<String> = Vec::new();
    walk_xml(&xml, "xml", |node| {
        if let Node::Text(t) = node {
            let t = t.trim();
            if !t.is_empty() {
                parts.push(t.to_string());
            }
        }
    })?;
    Ok(Extracted::text(parts.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_data_is_joined() {
        let xml = br#"<?xml version="1.0"?>
<catalog>
  <book id="1"><title>Dune</title><note><![CDATA[a < b]]></note></book>
  <book id="2"><title> Emma </title></book>
</catalog>"#;
        assert_eq!(convert_xml(xml).unwrap().text, "Dune a < b Emma");
    }

    #[test]
    fn broken_xml_is_malformed() {
        assert!(matches!(
            convert_xml(b"<a><b></a>"),
            Err(Doc2TextError::Malformed { format: "xml", .. })
        ));
    }
}
