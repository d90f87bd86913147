//! Routing, re-detection and the path entry points.

use edgequake_doc2text::{
    convert, convert_path, convert_path_readability, convert_sync, ConversionConfig,
    ConversionRequest, ConversionResponse, Dispatcher, Doc2TextError, Skipped,
};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn single_entry_zip(name: &str, body: &[u8]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(name, SimpleFileOptions::default()).unwrap();
    writer.write_all(body).unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn path_readability_round_trips_through_json() {
    let path = fixture("sample.txt");
    let expected = std::fs::read_to_string(&path).unwrap();

    let json = convert_path_readability(&path, false, &ConversionConfig::default())
        .await
        .unwrap();
    let resp: ConversionResponse = serde_json::from_slice(&json).unwrap();

    assert_eq!(resp.body, expected.trim());
    assert!(resp.error.is_empty());
    assert!(resp.meta.is_none());
}

#[tokio::test]
async fn path_entry_point_types_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Page.HTM");
    std::fs::write(
        &path,
        "<html><head><title>T</title></head><body><p>Body text</p></body></html>",
    )
    .unwrap();

    let resp = convert_path(&path, &ConversionConfig::default())
        .await
        .unwrap();

    assert_eq!(resp.body, "Body text");
    assert_eq!(resp.meta.unwrap()["title"], "T");
}

#[tokio::test]
async fn missing_path_is_file_not_found() {
    let err = convert_path("/definitely/not/here.txt", &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Doc2TextError::FileNotFound { .. }));
}

#[tokio::test]
async fn unmatched_type_is_rerouted_by_content() {
    let zip = single_entry_zip("note.txt", b"inside");

    let resp = convert(
        ConversionRequest::new(zip, "application/x-unknown"),
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(resp.body, "note.txt\r\ninside");
}

#[tokio::test]
async fn matched_type_is_never_sniffed() {
    // A zip claimed as text/plain is routed as text, not re-detected.
    let zip = single_entry_zip("note.txt", b"inside");

    let resp = convert(
        ConversionRequest::new(zip.clone(), "text/plain"),
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(resp.body, String::from_utf8_lossy(&zip).trim());
}

#[tokio::test]
async fn html_sniffed_from_unknown_type() {
    let resp = convert(
        ConversionRequest::new(
            b"<!DOCTYPE html><html><body><p>hello</p></body></html>".to_vec(),
            "application/x-mystery",
        ),
        &ConversionConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(resp.body, "hello");
}

#[tokio::test]
async fn claimed_type_with_charset_reaches_text_path() {
    let resp = convert(
        ConversionRequest::new(b"  just words  ".to_vec(), "text/plain; charset=utf-8"),
        &ConversionConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(resp.body, "just words");
}

#[tokio::test]
async fn undetectable_binary_is_an_empty_success() {
    let resp = Dispatcher::new(ConversionConfig::default())
        .convert(ConversionRequest::new(vec![0x00, 0x13, 0x37, 0x00], "application/x-blob"))
        .await
        .unwrap();

    assert!(resp.is_success());
    assert!(resp.body.is_empty());
    assert_eq!(
        resp.skipped,
        vec![Skipped::NoConverter {
            mime_type: "application/octet-stream".into()
        }]
    );
}

#[tokio::test]
async fn absent_data_is_rejected() {
    let err = convert(
        ConversionRequest {
            data: None,
            mime_type: "text/plain".into(),
            readability: false,
        },
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Doc2TextError::InvalidInput { .. }));
}

#[tokio::test]
async fn converter_errors_are_wrapped_once() {
    let err = convert(
        ConversionRequest::new(b"not rtf at all".to_vec(), "text/rtf"),
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();

    match &err {
        Doc2TextError::ConversionFailed { mime_type, source } => {
            assert_eq!(mime_type, "text/rtf");
            assert!(matches!(**source, Doc2TextError::Malformed { format: "rtf", .. }));
        }
        other => panic!("unexpected: {other:?}"),
    }
    let failed = ConversionResponse::failed(&err);
    assert!(!failed.is_success());
    assert!(failed.body.is_empty());
}

#[tokio::test]
async fn image_without_recognizer_fails() {
    let err = convert(
        ConversionRequest::new(b"\x89PNG\r\n\x1a\n".to_vec(), "image/png"),
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Doc2TextError::RecognizerUnavailable
    ));
}

#[tokio::test]
async fn readable_from_async_reader() {
    let request = ConversionRequest::from_reader(
        &b"<?xml version=\"1.0\"?><a><b>x</b><c>y</c></a>"[..],
        "text/xml",
        true,
    )
    .await
    .unwrap();
    let resp = Dispatcher::new(ConversionConfig::default())
        .convert(request)
        .await
        .unwrap();
    assert_eq!(resp.body, "x y");
}

#[test]
fn sync_wrapper_runs_its_own_runtime() {
    let resp = tokio_test::assert_ok!(convert_sync(
        ConversionRequest::new(b"sync".to_vec(), "text/plain"),
        &ConversionConfig::default(),
    ));
    assert_eq!(resp.body, "sync");
}
