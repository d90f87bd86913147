//! Zip archives through the public dispatcher.

use edgequake_doc2text::{
    ArchiveMetadata, ConversionConfig, ConversionRequest, Dispatcher, Doc2TextError, Skipped,
};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn zip_of(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        if name.ends_with('/') {
            writer
                .add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                .unwrap();
            continue;
        }
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn docx(title: &str, body: &str) -> Vec<u8> {
    let document = format!(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{body}</w:t></w:r></w:p></w:body></w:document>"#
    );
    let core = format!(
        r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{title}</dc:title></cp:coreProperties>"#
    );
    zip_of(&[
        ("word/document.xml", document.as_bytes()),
        ("docProps/core.xml", core.as_bytes()),
    ])
}

async fn convert_zip(
    data: Vec<u8>,
    config: ConversionConfig,
) -> Result<edgequake_doc2text::ConversionResponse, Doc2TextError> {
    Dispatcher::new(config)
        .convert(ConversionRequest::new(data, "application/zip"))
        .await
}

#[tokio::test]
async fn entries_are_labelled_and_concatenated() {
    let data = zip_of(&[
        ("docs/", b"".as_slice()),
        ("docs/a.txt", b"first entry".as_slice()),
        ("docs/b.html", b"<html><body><p>second entry</p></body></html>".as_slice()),
    ]);

    let resp = convert_zip(data, ConversionConfig::default()).await.unwrap();

    assert_eq!(
        resp.body,
        "docs/a.txt\r\nfirst entry\r\ndocs/b.html\r\nsecond entry"
    );
    assert!(resp.skipped.is_empty(), "{:?}", resp.skipped);
}

#[tokio::test]
async fn entry_ceiling_truncates_without_failing() {
    let names: Vec<String> = (0..15).map(|i| format!("f{i:02}.txt")).collect();
    let parts: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), b"x".as_slice())).collect();

    let resp = convert_zip(zip_of(&parts), ConversionConfig::default())
        .await
        .unwrap();

    assert!(resp.body.contains("f09.txt"));
    assert!(!resp.body.contains("f10.txt"));
    assert_eq!(resp.body.matches(".txt").count(), 10);
    assert_eq!(resp.skipped, vec![Skipped::EntryLimit { limit: 10 }]);
}

#[tokio::test]
async fn oversized_entry_is_skipped() {
    let big = vec![b'a'; 64];
    let data = zip_of(&[("big.txt", big.as_slice()), ("small.txt", b"fits".as_slice())]);
    let config = ConversionConfig::builder()
        .max_entry_bytes(32)
        .build()
        .unwrap();

    let resp = convert_zip(data, config).await.unwrap();

    assert_eq!(resp.body, "small.txt\r\nfits");
    assert_eq!(
        resp.skipped,
        vec![Skipped::EntryTooLarge {
            name: "big.txt".into(),
            size: 64,
            limit: 32
        }]
    );
}

#[tokio::test]
async fn unbounded_entry_ceiling_still_reads_entries() {
    let data = zip_of(&[("a.txt", b"alpha".as_slice()), ("b.txt", b"beta".as_slice())]);
    let config = ConversionConfig::builder()
        .max_entry_bytes(u64::MAX)
        .build()
        .unwrap();

    let resp = convert_zip(data, config).await.unwrap();

    assert_eq!(resp.body, "a.txt\r\nalpha\r\nb.txt\r\nbeta");
    assert!(resp.skipped.is_empty(), "{:?}", resp.skipped);
}

#[tokio::test]
async fn failed_and_empty_entries_are_recorded() {
    let data = zip_of(&[
        ("broken.docx", b"not a zip".as_slice()),
        ("blank.txt", b"   \n".as_slice()),
        ("ok.txt", b"survivor".as_slice()),
    ]);

    let resp = convert_zip(data, ConversionConfig::default()).await.unwrap();

    assert_eq!(resp.body, "ok.txt\r\nsurvivor");
    assert_eq!(resp.skipped.len(), 2);
    assert!(matches!(&resp.skipped[0], Skipped::Entry { name, .. } if name == "broken.docx"));
    assert_eq!(
        resp.skipped[1],
        Skipped::Entry {
            name: "blank.txt".into(),
            reason: "no text extracted".into()
        }
    );
}

#[tokio::test]
async fn last_entry_metadata_wins_by_default() {
    let first = docx("First", "one");
    let second = docx("Second", "two");
    let data = zip_of(&[("a.docx", first.as_slice()), ("b.docx", second.as_slice())]);

    let resp = convert_zip(data, ConversionConfig::default()).await.unwrap();

    let meta = resp.meta.unwrap();
    assert_eq!(meta["title"], "Second");
    assert!(resp.body.contains("a.docx\r\none"));
}

#[tokio::test]
async fn namespaced_metadata_keeps_every_entry() {
    let first = docx("First", "one");
    let second = docx("Second", "two");
    let data = zip_of(&[("a.docx", first.as_slice()), ("b.docx", second.as_slice())]);
    let config = ConversionConfig::builder()
        .archive_metadata(ArchiveMetadata::Namespaced)
        .build()
        .unwrap();

    let meta = convert_zip(data, config).await.unwrap().meta.unwrap();

    assert_eq!(meta["a.docx/title"], "First");
    assert_eq!(meta["b.docx/title"], "Second");
}

#[tokio::test]
async fn nesting_beyond_the_limit_is_not_opened() {
    let inner = zip_of(&[("deep.txt", b"too deep".as_slice())]);
    let middle = zip_of(&[("inner.zip", inner.as_slice())]);
    let data = zip_of(&[("middle.zip", middle.as_slice()), ("top.txt", b"top".as_slice())]);
    let config = ConversionConfig::builder()
        .max_nesting_depth(1)
        .build()
        .unwrap();

    let resp = convert_zip(data, config).await.unwrap();

    assert_eq!(resp.body, "top.txt\r\ntop");
    assert!(resp.skipped.iter().any(|s| matches!(
        s,
        Skipped::NestingLimit { name, depth: 2 } if name == "inner.zip"
    )));
}

#[tokio::test]
async fn garbage_archive_fails_to_open() {
    let err = convert_zip(b"definitely not a zip".to_vec(), ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_open_failure(), "got {err:?}");
}
