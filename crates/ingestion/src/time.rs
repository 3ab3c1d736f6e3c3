//! Time column resolution.
//!
//! Converts a raw time cell into Unix seconds under an explicit
//! [`TimeEncoding`], and picks a file's encoding by scoring sample rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ohlc_core::{
    RawValue, TimeConfig, TimeEncoding, TimeEncodingMode, TimestampSecs, SECS_PER_DAY,
    SPREADSHEET_UNIX_EPOCH_DAYS,
};
use tracing::{debug, warn};

/// Formats carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Date-time formats without an offset; read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

/// Date-only formats; midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%b %d %Y",
    "%b %d, %Y",
];

/// Floor a float to whole seconds, rejecting non-finite and out-of-range values.
fn floor_secs(v: f64) -> Option<TimestampSecs> {
    let v = v.floor();
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Spreadsheet serial day count (1899-12-30 epoch) to Unix seconds.
pub fn serial_to_unix(serial: f64) -> Option<TimestampSecs> {
    floor_secs((serial - SPREADSHEET_UNIX_EPOCH_DAYS) * SECS_PER_DAY)
}

/// Unix seconds, possibly fractional.
pub fn seconds_to_unix(secs: f64) -> Option<TimestampSecs> {
    floor_secs(secs)
}

/// Unix milliseconds to Unix seconds.
pub fn millis_to_unix(millis: f64) -> Option<TimestampSecs> {
    floor_secs(millis / 1000.0)
}

/// Parse a textual date/time into Unix seconds.
///
/// Accepts RFC 3339, RFC 2822, a fixed list of common export formats and
/// compact `YYYYMMDD`. Values without an offset are taken as UTC. Sub-second
/// precision is floored.
pub fn parse_date_string(s: &str) -> Option<TimestampSecs> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let millis = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        })
        .map(|dt| dt.timestamp_millis())
        .or_else(|| {
            NAIVE_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .or_else(|| {
            parse_naive_date(s)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
        })?;

    Some(millis.div_euclid(1000))
}

fn parse_naive_date(s: &str) -> Option<NaiveDate> {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[0..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Convert a raw time cell under a committed encoding.
///
/// Numeric encodings reject non-numeric cells. `DateString` rejects native
/// numeric cells but still offers numeric-looking text to the date parser.
pub fn convert(value: &RawValue, encoding: TimeEncoding) -> Option<TimestampSecs> {
    match encoding {
        TimeEncoding::SpreadsheetSerial => value.as_f64().and_then(serial_to_unix),
        TimeEncoding::UnixSeconds => value.as_f64().and_then(seconds_to_unix),
        TimeEncoding::UnixMillis => value.as_f64().and_then(millis_to_unix),
        TimeEncoding::DateString => match value {
            RawValue::Text(s) => parse_date_string(s),
            RawValue::Number(_) | RawValue::Empty => None,
        },
    }
}

/// Per-row range heuristic: numbers strictly inside `range` are serials,
/// everything else goes through the date parser.
pub fn resolve_range_heuristic(value: &RawValue, range: (f64, f64)) -> Option<TimestampSecs> {
    let (lo, hi) = range;
    match value.as_f64() {
        Some(v) if v > lo && v < hi => serial_to_unix(v),
        _ => match value {
            RawValue::Text(s) => parse_date_string(s),
            RawValue::Number(v) => parse_date_string(&v.to_string()),
            RawValue::Empty => None,
        },
    }
}

/// Outcome of the sniffing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingGuess {
    pub encoding: TimeEncoding,
    /// Share of sampled values that support `encoding`, in `[0, 1]`.
    pub confidence: f64,
    /// Number of non-absent values inspected.
    pub samples: usize,
}

fn score_index(encoding: TimeEncoding) -> usize {
    match encoding {
        TimeEncoding::DateString => 0,
        TimeEncoding::SpreadsheetSerial => 1,
        TimeEncoding::UnixSeconds => 2,
        TimeEncoding::UnixMillis => 3,
    }
}

/// Score every encoding over up to `config.sniff_rows` values and pick one.
///
/// A numeric value supports a numeric encoding when its converted instant
/// lies in `[plausible_from, plausible_until)`. A text value supports
/// `DateString` when it parses. Ties go to the earlier encoding in
/// [`TimeEncoding::PRIORITY`].
pub fn sniff_encoding<'a, I>(values: I, config: &TimeConfig) -> EncodingGuess
where
    I: IntoIterator<Item = &'a RawValue>,
{
    let plausible = |ts: Option<TimestampSecs>| {
        ts.is_some_and(|t| t >= config.plausible_from && t < config.plausible_until)
    };

    let mut scores = [0usize; 4];
    let mut samples = 0usize;

    for value in values
        .into_iter()
        .filter(|v| !v.is_absent())
        .take(config.sniff_rows)
    {
        samples += 1;
        if let RawValue::Text(s) = value {
            if parse_date_string(s).is_some() {
                scores[score_index(TimeEncoding::DateString)] += 1;
            }
        }
        if let Some(v) = value.as_f64() {
            for encoding in [
                TimeEncoding::SpreadsheetSerial,
                TimeEncoding::UnixSeconds,
                TimeEncoding::UnixMillis,
            ] {
                if plausible(convert(&RawValue::Number(v), encoding)) {
                    scores[score_index(encoding)] += 1;
                }
            }
        }
    }

    if samples == 0 {
        return EncodingGuess {
            encoding: TimeEncoding::DateString,
            confidence: 0.0,
            samples,
        };
    }

    let mut best = TimeEncoding::PRIORITY[0];
    for encoding in TimeEncoding::PRIORITY {
        if scores[score_index(encoding)] > scores[score_index(best)] {
            best = encoding;
        }
    }

    debug!(
        "time encoding scores over {} samples: date-string={} spreadsheet-serial={} unix-seconds={} unix-millis={}",
        samples, scores[0], scores[1], scores[2], scores[3]
    );

    EncodingGuess {
        encoding: best,
        confidence: scores[score_index(best)] as f64 / samples as f64,
        samples,
    }
}

/// Time resolution strategy committed for one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeResolver {
    /// One encoding for every row.
    Committed {
        encoding: TimeEncoding,
        /// Present when the encoding was sniffed.
        confidence: Option<f64>,
    },
    /// Per-row serial range heuristic.
    RangeHeuristic { serial_range: (f64, f64) },
}

impl TimeResolver {
    /// Commit a strategy for a file, sniffing `sample` when the mode is `Auto`.
    pub fn for_file<'a, I>(config: &TimeConfig, sample: I) -> Self
    where
        I: IntoIterator<Item = &'a RawValue>,
    {
        match config.mode {
            TimeEncodingMode::Auto => {
                let guess = sniff_encoding(sample, config);
                if guess.samples > 0 && guess.confidence < config.min_confidence {
                    warn!(
                        "low confidence time encoding: {} supported by {:.0}% of {} sampled rows",
                        guess.encoding,
                        guess.confidence * 100.0,
                        guess.samples
                    );
                }
                TimeResolver::Committed {
                    encoding: guess.encoding,
                    confidence: Some(guess.confidence),
                }
            }
            TimeEncodingMode::RangeHeuristic => TimeResolver::RangeHeuristic {
                serial_range: config.serial_range,
            },
            fixed => TimeResolver::Committed {
                // Only Auto and RangeHeuristic lack a fixed encoding.
                encoding: fixed.fixed().unwrap_or(TimeEncoding::DateString),
                confidence: None,
            },
        }
    }

    /// Resolve one raw cell to Unix seconds.
    pub fn resolve(&self, value: &RawValue) -> Option<TimestampSecs> {
        match *self {
            TimeResolver::Committed { encoding, .. } => convert(value, encoding),
            TimeResolver::RangeHeuristic { serial_range } => {
                resolve_range_heuristic(value, serial_range)
            }
        }
    }

    /// The committed encoding, if the strategy has one.
    pub fn encoding(&self) -> Option<TimeEncoding> {
        match self {
            TimeResolver::Committed { encoding, .. } => Some(*encoding),
            TimeResolver::RangeHeuristic { .. } => None,
        }
    }

    /// Sniffing confidence, if the encoding was sniffed.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            TimeResolver::Committed { confidence, .. } => *confidence,
            TimeResolver::RangeHeuristic { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_serial_44197_is_2021_01_01() {
        assert_eq!(serial_to_unix(44197.0), Some(1_609_459_200));
    }

    #[test]
    fn test_serial_fraction_is_time_of_day() {
        // 44197.5 = 2021-01-01T12:00:00Z
        assert_eq!(serial_to_unix(44197.5), Some(1_609_502_400));
    }

    #[test]
    fn test_serial_floors() {
        // Slightly under one second past midnight floors to midnight.
        let serial = 44197.0 + 0.9 / 86_400.0;
        assert_eq!(serial_to_unix(serial), Some(1_609_459_200));
    }

    #[test]
    fn test_conversions_reject_non_finite() {
        assert_eq!(serial_to_unix(f64::NAN), None);
        assert_eq!(seconds_to_unix(f64::INFINITY), None);
        assert_eq!(millis_to_unix(1e300), None);
    }

    #[test]
    fn test_millis_floor_before_epoch() {
        assert_eq!(millis_to_unix(-1.0), Some(-1));
        assert_eq!(millis_to_unix(1_609_459_200_999.0), Some(1_609_459_200));
    }

    #[test]
    fn test_parse_iso_variants() {
        assert_eq!(parse_date_string("2021-01-01T00:00:00Z"), Some(1_609_459_200));
        assert_eq!(parse_date_string("2021-01-01T00:00:00.750Z"), Some(1_609_459_200));
        assert_eq!(parse_date_string("2021-01-01T02:00:00+02:00"), Some(1_609_459_200));
        assert_eq!(parse_date_string("2021-01-01 00:00:00"), Some(1_609_459_200));
        assert_eq!(parse_date_string("2021-01-01T00:00"), Some(1_609_459_200));
        assert_eq!(parse_date_string("2021-01-01"), Some(1_609_459_200));
    }

    #[test]
    fn test_parse_export_variants() {
        assert_eq!(parse_date_string("2021/01/01 00:00"), Some(1_609_459_200));
        assert_eq!(parse_date_string("01/01/2021"), Some(1_609_459_200));
        assert_eq!(parse_date_string("01.01.2021 00:00"), Some(1_609_459_200));
        assert_eq!(parse_date_string("20210101"), Some(1_609_459_200));
        assert_eq!(parse_date_string("01-Jan-2021"), Some(1_609_459_200));
        assert_eq!(parse_date_string("Jan 01, 2021"), Some(1_609_459_200));
        assert_eq!(
            parse_date_string("Fri, 01 Jan 2021 00:00:00 +0000"),
            Some(1_609_459_200)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_date_string(""), None);
        assert_eq!(parse_date_string("yesterday"), None);
        assert_eq!(parse_date_string("2021-13-45"), None);
        assert_eq!(parse_date_string("1609459200"), None);
    }

    #[test]
    fn test_convert_respects_encoding_kind() {
        assert_eq!(
            convert(&text("1609459200"), TimeEncoding::UnixSeconds),
            Some(1_609_459_200)
        );
        assert_eq!(
            convert(&RawValue::Number(1_609_459_200_000.0), TimeEncoding::UnixMillis),
            Some(1_609_459_200)
        );
        assert_eq!(convert(&text("2021-01-01"), TimeEncoding::UnixSeconds), None);
        assert_eq!(convert(&RawValue::Number(44197.0), TimeEncoding::DateString), None);
        assert_eq!(
            convert(&text("20210101"), TimeEncoding::DateString),
            Some(1_609_459_200)
        );
    }

    #[test]
    fn test_range_heuristic_branches() {
        let range = (40_000.0, 100_000.0);
        assert_eq!(
            resolve_range_heuristic(&RawValue::Number(44197.0), range),
            Some(1_609_459_200)
        );
        assert_eq!(
            resolve_range_heuristic(&text("44197"), range),
            Some(1_609_459_200)
        );
        assert_eq!(
            resolve_range_heuristic(&text("2021-01-01"), range),
            Some(1_609_459_200)
        );
        // Bounds are exclusive.
        assert_eq!(resolve_range_heuristic(&RawValue::Number(40_000.0), range), None);
        assert_eq!(resolve_range_heuristic(&RawValue::Number(12.5), range), None);
        assert_eq!(resolve_range_heuristic(&RawValue::Empty, range), None);
    }

    #[test]
    fn test_sniff_picks_each_encoding() {
        let config = TimeConfig::default();

        let serials = [RawValue::Number(44197.0), RawValue::Number(44198.0)];
        assert_eq!(
            sniff_encoding(&serials, &config).encoding,
            TimeEncoding::SpreadsheetSerial
        );

        let seconds = [text("1609459200"), text("1609545600")];
        assert_eq!(
            sniff_encoding(&seconds, &config).encoding,
            TimeEncoding::UnixSeconds
        );

        let millis = [text("1609459200000"), text("1609545600000")];
        assert_eq!(
            sniff_encoding(&millis, &config).encoding,
            TimeEncoding::UnixMillis
        );

        let dates = [text("2021-01-01"), text("2021-01-02")];
        let guess = sniff_encoding(&dates, &config);
        assert_eq!(guess.encoding, TimeEncoding::DateString);
        assert_relative_eq!(guess.confidence, 1.0);
    }

    #[test]
    fn test_sniff_confidence_and_sample_limit() {
        let config = TimeConfig {
            sniff_rows: 4,
            ..TimeConfig::default()
        };
        let values = [
            text("1609459200"),
            text("1609545600"),
            text("1609632000"),
            text("garbage"),
            text("2021-01-05"),
            text("2021-01-06"),
        ];
        let guess = sniff_encoding(&values, &config);
        assert_eq!(guess.samples, 4);
        assert_eq!(guess.encoding, TimeEncoding::UnixSeconds);
        assert_relative_eq!(guess.confidence, 0.75);
    }

    #[test]
    fn test_sniff_skips_absent_and_defaults_on_empty() {
        let config = TimeConfig::default();
        let values = [RawValue::Empty, text("  ")];
        let guess = sniff_encoding(&values, &config);
        assert_eq!(guess.samples, 0);
        assert_eq!(guess.encoding, TimeEncoding::DateString);
        assert_relative_eq!(guess.confidence, 0.0);
    }

    #[test]
    fn test_resolver_fixed_mode_does_not_sniff() {
        let config = TimeConfig {
            mode: TimeEncodingMode::UnixMillis,
            ..TimeConfig::default()
        };
        let resolver = TimeResolver::for_file(&config, &[text("2021-01-01")]);
        assert_eq!(resolver.encoding(), Some(TimeEncoding::UnixMillis));
        assert_eq!(resolver.confidence(), None);
        assert_eq!(resolver.resolve(&text("2021-01-01")), None);
    }

    #[test]
    fn test_resolver_range_heuristic() {
        let config = TimeConfig {
            mode: TimeEncodingMode::RangeHeuristic,
            ..TimeConfig::default()
        };
        let resolver = TimeResolver::for_file(&config, std::iter::empty::<&RawValue>());
        assert_eq!(resolver.encoding(), None);
        assert_eq!(resolver.resolve(&RawValue::Number(44197.0)), Some(1_609_459_200));
    }
}
