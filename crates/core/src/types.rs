//! Core data types for the OHLC ingest pipeline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp in seconds since Unix epoch (UTC).
pub type TimestampSecs = i64;

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
pub const SPREADSHEET_UNIX_EPOCH_DAYS: f64 = 25_569.0;

/// Seconds per day.
pub const SECS_PER_DAY: f64 = 86_400.0;

/// One canonical OHLC(+volume) candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Interval timestamp (Unix seconds).
    pub time: TimestampSecs,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume, when the source carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// A raw cell value as decoded by a tabular reader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Cell text, untrimmed.
    Text(String),
    /// Native numeric cell (workbooks only).
    Number(f64),
    /// Blank or missing cell.
    Empty,
}

impl RawValue {
    /// Whether the value counts as absent for field resolution.
    ///
    /// Whitespace-only text is absent; a numeric zero is not.
    pub fn is_absent(&self) -> bool {
        match self {
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Number(_) => false,
            RawValue::Empty => true,
        }
    }

    /// Numeric view of the value: native numbers as-is, text parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) => Some(*v),
            RawValue::Text(s) => s.trim().parse::<f64>().ok(),
            RawValue::Empty => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Empty => Ok(()),
        }
    }
}

/// One decoded row, keyed by the header text of its source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based row number in the source (header row included).
    pub source_row: usize,
    /// `(header, value)` pairs in source column order.
    pub cells: Vec<(String, RawValue)>,
}

impl RawRow {
    /// Create a row from its cells.
    pub fn new(source_row: usize, cells: Vec<(String, RawValue)>) -> Self {
        Self { source_row, cells }
    }

    /// Value of the first cell whose header equals `header` exactly.
    pub fn get(&self, header: &str) -> Option<&RawValue> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Canonical fields a source column can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Time,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl CanonicalField {
    /// All fields, in output order.
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Time,
        CanonicalField::Open,
        CanonicalField::High,
        CanonicalField::Low,
        CanonicalField::Close,
        CanonicalField::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Time => "time",
            CanonicalField::Open => "open",
            CanonicalField::High => "high",
            CanonicalField::Low => "low",
            CanonicalField::Close => "close",
            CanonicalField::Volume => "volume",
        }
    }

    /// Whether a row must resolve this field to be accepted.
    pub fn is_required(self) -> bool {
        !matches!(self, CanonicalField::Volume)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a file encodes its time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEncoding {
    /// Day count anchored at 1899-12-30, fractional part is time of day.
    SpreadsheetSerial,
    /// Unix epoch seconds.
    UnixSeconds,
    /// Unix epoch milliseconds.
    UnixMillis,
    /// Textual date/time.
    DateString,
}

impl TimeEncoding {
    /// Tie-break order used when sniffing scores are equal.
    pub const PRIORITY: [TimeEncoding; 4] = [
        TimeEncoding::DateString,
        TimeEncoding::SpreadsheetSerial,
        TimeEncoding::UnixSeconds,
        TimeEncoding::UnixMillis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeEncoding::SpreadsheetSerial => "spreadsheet-serial",
            TimeEncoding::UnixSeconds => "unix-seconds",
            TimeEncoding::UnixMillis => "unix-millis",
            TimeEncoding::DateString => "date-string",
        }
    }

    /// Whether the encoding reads numeric values.
    pub fn is_numeric(self) -> bool {
        !matches!(self, TimeEncoding::DateString)
    }
}

impl fmt::Display for TimeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy for choosing a file's [`TimeEncoding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEncodingMode {
    /// Score sample rows and commit the best encoding for the whole file.
    #[default]
    Auto,
    /// Per-row: numbers inside the serial range are serials, everything else is parsed as a date.
    RangeHeuristic,
    SpreadsheetSerial,
    UnixSeconds,
    UnixMillis,
    DateString,
}

impl TimeEncodingMode {
    /// The encoding this mode commits to up front, if any.
    pub fn fixed(self) -> Option<TimeEncoding> {
        match self {
            TimeEncodingMode::Auto | TimeEncodingMode::RangeHeuristic => None,
            TimeEncodingMode::SpreadsheetSerial => Some(TimeEncoding::SpreadsheetSerial),
            TimeEncodingMode::UnixSeconds => Some(TimeEncoding::UnixSeconds),
            TimeEncodingMode::UnixMillis => Some(TimeEncoding::UnixMillis),
            TimeEncodingMode::DateString => Some(TimeEncoding::DateString),
        }
    }
}

impl FromStr for TimeEncodingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "auto" => Ok(TimeEncodingMode::Auto),
            "range-heuristic" | "heuristic" => Ok(TimeEncodingMode::RangeHeuristic),
            "spreadsheet-serial" | "serial" => Ok(TimeEncodingMode::SpreadsheetSerial),
            "unix-seconds" | "seconds" => Ok(TimeEncodingMode::UnixSeconds),
            "unix-millis" | "millis" => Ok(TimeEncodingMode::UnixMillis),
            "date-string" | "string" => Ok(TimeEncodingMode::DateString),
            other => Err(Error::config(format!(
                "invalid time encoding '{other}'. expected one of: auto | range-heuristic | \
                 spreadsheet-serial | unix-seconds | unix-millis | date-string"
            ))),
        }
    }
}

/// Container format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Delimited text. `None` sniffs the delimiter from the header line.
    Delimited { delimiter: Option<u8> },
    /// Spreadsheet workbook; only the first sheet is read.
    Workbook,
}

impl SourceFormat {
    /// Comma-separated text.
    pub const CSV: SourceFormat = SourceFormat::Delimited {
        delimiter: Some(b','),
    };

    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Self::from_extension(&ext)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
    }

    /// Pick a format from a bare extension (no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(SourceFormat::Delimited { delimiter: None }),
            "tsv" => Some(SourceFormat::Delimited {
                delimiter: Some(b'\t'),
            }),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_absent() {
        assert!(RawValue::Empty.is_absent());
        assert!(RawValue::Text("  ".to_string()).is_absent());
        assert!(!RawValue::Text("0".to_string()).is_absent());
        assert!(!RawValue::Number(0.0).is_absent());
    }

    #[test]
    fn test_raw_value_as_f64() {
        assert_eq!(RawValue::Text(" 12.5 ".to_string()).as_f64(), Some(12.5));
        assert_eq!(RawValue::Number(3.0).as_f64(), Some(3.0));
        assert_eq!(RawValue::Text("abc".to_string()).as_f64(), None);
        assert_eq!(RawValue::Empty.as_f64(), None);
    }

    #[test]
    fn test_raw_row_get_first_match() {
        let row = RawRow::new(
            2,
            vec![
                ("open".to_string(), RawValue::Text("1".to_string())),
                ("open".to_string(), RawValue::Text("2".to_string())),
            ],
        );
        assert_eq!(row.get("open"), Some(&RawValue::Text("1".to_string())));
        assert_eq!(row.get("Open"), None);
    }

    #[test]
    fn test_candle_json_omits_missing_volume() {
        let candle = Candle {
            time: 1_609_459_200,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: None,
        };
        let json = serde_json::to_string(&candle).unwrap();
        assert!(!json.contains("volume"));
        let back: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candle);
    }

    #[test]
    fn test_time_encoding_mode_parse() {
        assert_eq!("auto".parse::<TimeEncodingMode>().unwrap(), TimeEncodingMode::Auto);
        assert_eq!(
            "Unix_Millis".parse::<TimeEncodingMode>().unwrap(),
            TimeEncodingMode::UnixMillis
        );
        assert_eq!(
            "range-heuristic".parse::<TimeEncodingMode>().unwrap().fixed(),
            None
        );
        assert!("fortnights".parse::<TimeEncodingMode>().is_err());
    }

    #[test]
    fn test_source_format_from_path() {
        assert_eq!(
            SourceFormat::from_path(Path::new("bars.CSV")).unwrap(),
            SourceFormat::Delimited { delimiter: None }
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("bars.tsv")).unwrap(),
            SourceFormat::Delimited {
                delimiter: Some(b'\t')
            }
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("export.xls")).unwrap(),
            SourceFormat::Workbook
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("bars.parquet")),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
