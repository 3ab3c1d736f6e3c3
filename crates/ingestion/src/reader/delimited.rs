//! Delimited text (CSV, TSV, semicolon exports).

use ohlc_core::{Error, ParsePosition, RawRow, RawValue, Result};
use tracing::warn;

use super::assemble_rows;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Candidate delimiters, in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Guess the delimiter from the first non-blank line.
///
/// Counts each candidate outside double quotes; the highest count wins and
/// ties go to the earlier candidate. Falls back to `,`.
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let Some(line) = bytes
        .split(|b| *b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .find(|l| l.iter().any(|b| !b.is_ascii_whitespace()))
    else {
        return b',';
    };

    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for &b in line {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = DELIMITER_CANDIDATES.iter().position(|d| *d == b) {
                counts[i] += 1;
            }
        }
    }

    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    if counts[best] == 0 {
        warn!("no known delimiter in header line, assuming ','");
    }
    DELIMITER_CANDIDATES[best]
}

fn map_csv_error(err: csv::Error) -> Error {
    let position = err.position().map(|p| ParsePosition {
        byte: Some(p.byte()),
        line: Some(p.line()),
        record: Some(p.record()),
    });
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::Io(e),
        _ => match position {
            Some(p) => Error::parse_at(message, p),
            None => Error::parse(message),
        },
    }
}

/// Line on which a record starts.
///
/// The decoder positions a record just past the previous terminator, so empty
/// lines it skipped before the record are counted here.
fn record_line(bytes: &[u8], position: &csv::Position) -> usize {
    let start = usize::try_from(position.byte()).map_or(bytes.len(), |b| b.min(bytes.len()));
    let skipped = bytes[start..]
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .filter(|b| **b == b'\n')
        .count();
    position.line() as usize + skipped
}

fn cell_value(field: &str) -> RawValue {
    if field.trim().is_empty() {
        RawValue::Empty
    } else {
        RawValue::Text(field.to_string())
    }
}

/// Decode delimited text. `delimiter: None` sniffs it.
///
/// Records may have differing lengths. Row numbers are the 1-based line on
/// which each record starts, counting from after the byte-order mark.
pub fn read_delimited(bytes: &[u8], delimiter: Option<u8>) -> Result<Vec<RawRow>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(bytes));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let records = reader.records().map(|record| {
        let record = record.map_err(map_csv_error)?;
        let line = record
            .position()
            .map(|p| record_line(bytes, p))
            .unwrap_or(0);
        Ok((line, record.iter().map(cell_value).collect()))
    });

    assemble_rows(records)
}
