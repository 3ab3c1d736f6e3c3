//! Tabular readers: raw bytes to header-keyed rows.
//!
//! The first non-blank row is the header; its cell text keys every later
//! row. Blank rows are skipped wherever they occur. A reader either returns
//! every row or fails; there is no partial output.

pub mod delimited;
pub mod workbook;

use std::io::Read;

use ohlc_core::{RawRow, RawValue, Result, SourceFormat};

pub use delimited::{read_delimited, sniff_delimiter};
pub use workbook::{read_workbook, rows_from_range};

/// Decode a complete in-memory file.
pub fn read_table(bytes: Vec<u8>, format: SourceFormat) -> Result<Vec<RawRow>> {
    match format {
        SourceFormat::Delimited { delimiter } => read_delimited(&bytes, delimiter),
        SourceFormat::Workbook => read_workbook(bytes),
    }
}

/// Drain a stream to completion, then decode it.
///
/// A read failure anywhere in the stream surfaces as `Error::Io`.
pub fn read_source<R: Read>(mut source: R, format: SourceFormat) -> Result<Vec<RawRow>> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    read_table(bytes, format)
}

/// Header text for a cell: trimmed, with any byte-order mark removed.
fn header_text(cell: &RawValue) -> String {
    match cell {
        RawValue::Text(s) => s.trim().trim_start_matches('\u{feff}').trim().to_string(),
        RawValue::Number(v) => v.to_string(),
        RawValue::Empty => String::new(),
    }
}

/// Turn decoded records into keyed rows.
///
/// Records are `(source_row, cells)`. Short rows leave trailing columns
/// empty; cells past the header width are dropped.
fn assemble_rows<I>(records: I) -> Result<Vec<RawRow>>
where
    I: IntoIterator<Item = Result<(usize, Vec<RawValue>)>>,
{
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in records {
        let (source_row, cells) = record?;
        if cells.iter().all(RawValue::is_absent) {
            continue;
        }
        match &header {
            None => header = Some(cells.iter().map(header_text).collect()),
            Some(names) => {
                let mut values = cells.into_iter();
                let keyed = names
                    .iter()
                    .map(|name| (name.clone(), values.next().unwrap_or(RawValue::Empty)))
                    .collect();
                rows.push(RawRow::new(source_row, keyed));
            }
        }
    }

    Ok(rows)
}
