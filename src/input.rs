//! Input plumbing: reading local files, materialising payloads on disk for
//! engines that need a path, and fetching `text/url` documents.
//!
//! [`LocalFile`] owns a `NamedTempFile`, so the payload is deleted when it is
//! dropped: on success, on early `?` returns, and while a panic unwinds.

use crate::error::Doc2TextError;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Check if the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// A payload written to a temporary file that is removed on drop.
#[derive(Debug)]
pub struct LocalFile {
    file: NamedTempFile,
}

impl LocalFile {
    /// Write `data` to a fresh temporary file ending in `suffix` (e.g. `".pdf"`).
    pub fn new(data: &[u8], suffix: &str) -> Result<Self, Doc2TextError> {
        let mut file = tempfile::Builder::new()
            .prefix("doc2text-")
            .suffix(suffix)
            .tempfile()
            .map_err(|e| Doc2TextError::Internal(format!("tempfile: {e}")))?;
        file.write_all(data)
            .and_then(|_| file.flush())
            .map_err(|e| Doc2TextError::Internal(format!("tempfile write: {e}")))?;
        debug!("Materialised {} bytes at {}", data.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Read a whole local file, mapping I/O failures to typed errors.
pub async fn read_path(path: &Path) -> Result<Vec<u8>, Doc2TextError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Doc2TextError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Doc2TextError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Doc2TextError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Fetch a URL and return the response body as text.
pub async fn fetch_url(url: &str, timeout_secs: u64) -> Result<String, Doc2TextError> {
    if !is_url(url) {
        return Err(Doc2TextError::FetchFailed {
            url: url.to_string(),
            reason: "not an http(s) URL".to_string(),
        });
    }
    info!("Fetching document from: {}", url);

    let failed = |reason: String| Doc2TextError::FetchFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            Doc2TextError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    let body = response.text().await.map_err(classify)?;
    debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(body)
}
