//! Typed coercion of mapped rows into candidate records.

use ohlc_core::{CanonicalField, RawValue, TimestampSecs};

use crate::mapper::MappedRow;
use crate::time::TimeResolver;

/// A row after coercion, before validation.
///
/// Price fields hold `f64::NAN` when their cell was absent or non-numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub source_row: usize,
    pub time: Option<TimestampSecs>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    /// First required field the mapper could not resolve.
    pub missing: Option<CanonicalField>,
}

impl CandidateRecord {
    /// Price fields in canonical order.
    pub fn prices(&self) -> [(CanonicalField, f64); 4] {
        [
            (CanonicalField::Open, self.open),
            (CanonicalField::High, self.high),
            (CanonicalField::Low, self.low),
            (CanonicalField::Close, self.close),
        ]
    }
}

/// Parse a numeric cell, yielding NaN for absent or non-numeric input.
pub fn parse_number(value: Option<&RawValue>) -> f64 {
    value.and_then(RawValue::as_f64).unwrap_or(f64::NAN)
}

/// Coerces mapped rows using the time strategy committed for the file.
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    time: TimeResolver,
}

impl RecordNormalizer {
    pub fn new(time: TimeResolver) -> Self {
        Self { time }
    }

    /// Coerce one mapped row.
    pub fn normalize(&self, row: &MappedRow<'_>) -> CandidateRecord {
        let volume = parse_number(row.get(CanonicalField::Volume));
        CandidateRecord {
            source_row: row.source_row,
            time: row
                .get(CanonicalField::Time)
                .and_then(|v| self.time.resolve(v)),
            open: parse_number(row.get(CanonicalField::Open)),
            high: parse_number(row.get(CanonicalField::High)),
            low: parse_number(row.get(CanonicalField::Low)),
            close: parse_number(row.get(CanonicalField::Close)),
            volume: volume.is_finite().then_some(volume),
            missing: row.first_missing_required(),
        }
    }
}
