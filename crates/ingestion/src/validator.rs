//! Row admission: the best-effort filter between normalization and sorting.

use ohlc_core::{Candle, CanonicalField};
use serde::Serialize;
use thiserror::Error;

use crate::normalizer::CandidateRecord;

/// Why a row was left out of the output.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum RowDefect {
    /// No alias for a required field carried a value.
    #[error("missing required field '{0}'")]
    MissingField(CanonicalField),
    /// A required price did not parse to a finite number.
    #[error("field '{0}' is not a finite number")]
    NonNumeric(CanonicalField),
    /// The time cell did not resolve under the file's time encoding.
    #[error("time value could not be resolved")]
    UnresolvedTime,
}

/// A rejected row with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowDefectReport {
    pub source_row: usize,
    pub defect: RowDefect,
}

/// Admit a candidate as a candle, or say why not.
///
/// Checks run in order: missing field, unresolved time, non-finite price.
pub fn validate(candidate: &CandidateRecord) -> Result<Candle, RowDefect> {
    if let Some(field) = candidate.missing {
        return Err(RowDefect::MissingField(field));
    }
    let time = candidate.time.ok_or(RowDefect::UnresolvedTime)?;
    if let Some((field, _)) = candidate.prices().into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(RowDefect::NonNumeric(field));
    }

    Ok(Candle {
        time,
        open: candidate.open,
        high: candidate.high,
        low: candidate.low,
        close: candidate.close,
        volume: candidate.volume.filter(|v| v.is_finite()),
    })
}
