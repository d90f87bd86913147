//! Excel workbooks (`.xls` and `.xlsx`) via calamine.
//!
//! Each sheet becomes a header line followed by one line per non-empty row:
//!
//! ```text
//! Sheet "Sheet1" (5 rows):
//! Name, Phone
//! Ann, 555-0100
//! ```
//!
//! The row figure in the header is the index of the last used row, so a
//! sheet with a header row and five data rows reports 5.

use crate::error::Doc2TextError;
use crate::output::Extracted;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::fmt::Write as _;
use std::io::Cursor;
use tracing::warn;

pub fn convert_spreadsheet(data: &[u8]) -> Result<Extracted, Doc2TextError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(data)).map_err(|e| Doc2TextError::Malformed {
            format: "spreadsheet",
            detail: e.to_string(),
        })?;

    let mut out = String::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                warn!("Sheet {:?} unreadable: {}", name, e);
                continue;
            }
        };
        let last_row = range.end().map(|(row, _)| row).unwrap_or(0);
        let _ = writeln!(out, "Sheet \"{name}\" ({last_row} rows):");

        for row in range.rows() {
            let cells: Vec<String> = row.iter().filter_map(clean_cell).collect();
            if !cells.is_empty() {
                out.push_str(&cells.join(", "));
                out.push('\n');
            }
        }
    }
    Ok(Extracted::text(out))
}

fn clean_cell(cell: &Data) -> Option<String> {
    if matches!(cell, Data::Empty) {
        return None;
    }
    let text = cell.to_string().replace('\n', " ").replace('\r', "");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
