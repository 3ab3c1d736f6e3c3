//! Spreadsheet workbooks (xlsx, xlsm, xlsb, xls, ods). First sheet only.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use ohlc_core::{Error, RawRow, RawValue, Result, SPREADSHEET_UNIX_EPOCH_DAYS};

use super::assemble_rows;

fn map_calamine_error(err: calamine::Error) -> Error {
    match err {
        calamine::Error::Io(e) => Error::Io(e),
        other => Error::parse(format!("workbook: {other}")),
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Serial day count on the 1899-12-30 epoch.
///
/// Workbooks on the 1904 date system store serials 1462 days lower; the
/// calamine conversion applies that offset, so the serial is rebuilt from it.
fn date_serial(dt: &ExcelDateTime) -> f64 {
    if dt.is_duration() {
        return dt.as_f64();
    }
    match dt.as_datetime() {
        Some(naive) => {
            naive.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + SPREADSHEET_UNIX_EPOCH_DAYS
        }
        None => dt.as_f64(),
    }
}

/// Convert one cell. Date cells become their spreadsheet serial.
fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Int(v) => RawValue::Number(*v as f64),
        Data::Float(v) => RawValue::Number(*v),
        Data::DateTime(dt) => RawValue::Number(date_serial(dt)),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                RawValue::Empty
            } else {
                RawValue::Text(s.clone())
            }
        }
        Data::Bool(b) => RawValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => RawValue::Empty,
    }
}

/// Rows of an already-decoded sheet. Row numbers are 1-based sheet rows.
pub fn rows_from_range(range: &Range<Data>) -> Result<Vec<RawRow>> {
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    assemble_rows(
        range
            .rows()
            .enumerate()
            .map(|(i, cells)| Ok((first_row + i + 1, cells.iter().map(cell_value).collect()))),
    )
}

/// Decode the first sheet of an in-memory workbook. Zero bytes is an empty table.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Vec<RawRow>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(map_calamine_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::parse("workbook contains no sheets"))?
        .map_err(map_calamine_error)?;
    rows_from_range(&range)
}
