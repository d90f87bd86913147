//! Zip archives: every entry goes back through the dispatcher.
//!
//! Entries are visited in central-directory order, one at a time. Limits:
//!
//! * `max_archive_entries`: once that many file entries were visited the
//!   rest are never opened and an `EntryLimit` diagnostic is recorded.
//! * `max_entry_bytes`: larger entries are skipped without being
//!   decompressed past the ceiling.
//! * `max_nesting_depth`: entries of a container nested too deep are not
//!   opened.
//!
//! A failed or empty entry never fails the archive.

use crate::dispatch::{DispatchState, Dispatcher};
use crate::error::{Doc2TextError, Skipped};
use crate::formats::read_capped;
use crate::mime::mime_type_by_extension;
use crate::output::Extracted;
use std::io::Cursor;
use tracing::{debug, warn};
use zip::ZipArchive;

type Archive = ZipArchive<Cursor<Vec<u8>>>;

pub(crate) async fn extract_archive(
    dispatcher: &Dispatcher,
    data: &[u8],
    state: DispatchState,
) -> Result<Extracted, Doc2TextError> {
    let config = dispatcher.config();
    let mut archive =
        ZipArchive::new(Cursor::new(data.to_vec())).map_err(|e| Doc2TextError::OpenFailed {
            format: "archive",
            detail: e.to_string(),
        })?;

    let entry_state = state.nested();
    let mut out = Extracted::default();
    let mut visited = 0usize;

    for index in 0..archive.len() {
        let Some(name) = archive.name_for_index(index).map(str::to_string) else {
            continue;
        };
        if name.ends_with('/') {
            continue;
        }
        if visited == config.max_archive_entries {
            warn!(
                "Archive has more than {} entries; ignoring the rest",
                config.max_archive_entries
            );
            out.skipped.push(Skipped::EntryLimit {
                limit: config.max_archive_entries,
            });
            break;
        }
        visited += 1;

        if entry_state.nesting() > config.max_nesting_depth {
            warn!("Entry {:?}: nesting depth {} over limit", name, entry_state.nesting());
            out.skipped.push(Skipped::NestingLimit {
                name,
                depth: entry_state.nesting(),
            });
            continue;
        }

        let limit = config.max_entry_bytes;
        let entry_name = name.clone();
        let (returned, read) = tokio::task::spawn_blocking(move || {
            let read = read_entry(&mut archive, index, &entry_name, limit);
            (archive, read)
        })
        .await
        .map_err(|e| Doc2TextError::Internal(format!("archive read task panicked: {e}")))?;
        archive = returned;

        let bytes = match read {
            Ok(bytes) => bytes,
            Err(skip) => {
                warn!("{}", skip);
                out.skipped.push(skip);
                continue;
            }
        };

        let mime_type = mime_type_by_extension(&name);
        debug!("Entry {:?}: {} bytes as {}", name, bytes.len(), mime_type);
        match dispatcher.dispatch(&bytes, mime_type, false, entry_state).await {
            Ok(entry) => {
                out.skipped.extend(entry.skipped);
                let body = entry.text.trim();
                if body.is_empty() {
                    debug!("Entry {:?}: no text", name);
                    out.skipped.push(Skipped::Entry {
                        name,
                        reason: "no text extracted".into(),
                    });
                    continue;
                }
                out.text.push_str(&name);
                out.text.push_str("\r\n");
                out.text.push_str(body);
                out.text.push_str("\r\n");
                out.meta = config
                    .archive_metadata
                    .fold(out.meta.take(), &name, entry.meta);
            }
            Err(e) => {
                warn!("Entry {:?} skipped: {}", name, e);
                out.skipped.push(Skipped::Entry {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(out)
}

fn read_entry(archive: &mut Archive, index: usize, name: &str, limit: u64) -> Result<Vec<u8>, Skipped> {
    let entry_failed = |reason: String| Skipped::Entry {
        name: name.to_string(),
        reason,
    };
    let file = archive
        .by_index(index)
        .map_err(|e| entry_failed(e.to_string()))?;

    let declared = file.size();
    if declared > limit {
        return Err(Skipped::EntryTooLarge {
            name: name.to_string(),
            size: declared,
            limit,
        });
    }

    // The declared size can lie; never inflate more than one byte past the ceiling.
    read_capped(file, declared, limit)
        .map_err(|e| entry_failed(e.to_string()))?
        .ok_or_else(|| Skipped::EntryTooLarge {
            name: name.to_string(),
            size: limit.saturating_add(1),
            limit,
        })
}
