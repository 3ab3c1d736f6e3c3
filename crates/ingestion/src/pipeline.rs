//! End-to-end ingestion: read, map, normalize, validate, sort.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ohlc_core::{
    Candle, CanonicalField, Error, IngestConfig, RawRow, Result, SourceFormat, TimeEncoding,
    TimeEncodingMode,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::mapper::FieldMapper;
use crate::normalizer::RecordNormalizer;
use crate::reader;
use crate::sorter::sort_candles;
use crate::time::TimeResolver;
use crate::validator::{validate, RowDefect, RowDefectReport};

/// Cooperative cancellation flag shared between a caller and a running ingest.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-run diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Data rows produced by the reader (header and blank rows excluded).
    pub rows_read: usize,
    pub accepted: usize,
    pub rejected_missing_field: usize,
    pub rejected_non_numeric: usize,
    pub rejected_unresolved_time: usize,
    pub time_mode: TimeEncodingMode,
    /// Encoding committed for the file; `None` under the range heuristic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_encoding: Option<TimeEncoding>,
    /// Sniffing confidence, present when the encoding was sniffed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_confidence: Option<f64>,
    /// Every rejected row. Only filled in strict mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defects: Vec<RowDefectReport>,
}

impl IngestReport {
    fn new(rows_read: usize, mode: TimeEncodingMode, resolver: &TimeResolver) -> Self {
        Self {
            rows_read,
            accepted: 0,
            rejected_missing_field: 0,
            rejected_non_numeric: 0,
            rejected_unresolved_time: 0,
            time_mode: mode,
            time_encoding: resolver.encoding(),
            encoding_confidence: resolver.confidence(),
            defects: Vec::new(),
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected_missing_field + self.rejected_non_numeric + self.rejected_unresolved_time
    }

    /// True when no row was dropped.
    pub fn is_clean(&self) -> bool {
        self.rejected() == 0
    }

    fn record(&mut self, defect: RowDefect) {
        match defect {
            RowDefect::MissingField(_) => self.rejected_missing_field += 1,
            RowDefect::NonNumeric(_) => self.rejected_non_numeric += 1,
            RowDefect::UnresolvedTime => self.rejected_unresolved_time += 1,
        }
    }
}

/// Canonical candles plus the report for the run that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub candles: Vec<Candle>,
    pub report: IngestReport,
}

enum RowVerdict {
    Accepted(Candle),
    Rejected(RowDefectReport),
}

/// A configured ingest run.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    config: IngestConfig,
    cancel: Option<CancelToken>,
}

impl IngestPipeline {
    /// Create a pipeline. Fails on invalid configuration.
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest a file, picking the format from its extension.
    pub fn ingest_path(&self, path: &Path) -> Result<IngestOutcome> {
        let format = SourceFormat::from_path(path)?;
        let bytes = fs::read(path)?;
        self.ingest_bytes(bytes, format)
    }

    /// Drain `source` and ingest it.
    pub fn ingest_reader<R: Read>(&self, source: R, format: SourceFormat) -> Result<IngestOutcome> {
        let rows = reader::read_source(source, self.effective_format(format))?;
        self.ingest_rows(&rows)
    }

    /// Ingest a complete in-memory file.
    pub fn ingest_bytes(&self, bytes: Vec<u8>, format: SourceFormat) -> Result<IngestOutcome> {
        let rows = reader::read_table(bytes, self.effective_format(format))?;
        self.ingest_rows(&rows)
    }

    /// Run the row stages over already-decoded rows.
    pub fn ingest_rows(&self, rows: &[RawRow]) -> Result<IngestOutcome> {
        self.check_cancelled()?;

        let mapper = FieldMapper::new(&self.config.aliases);
        if let Some(first) = rows.first() {
            let headers: Vec<String> = first.cells.iter().map(|(h, _)| h.clone()).collect();
            for field in CanonicalField::ALL {
                debug!(
                    "column for {}: {}",
                    field,
                    mapper.column_for(field, &headers).unwrap_or("<none>")
                );
            }
        }

        let resolver = TimeResolver::for_file(
            &self.config.time,
            rows.iter()
                .filter_map(|row| mapper.resolve(row, CanonicalField::Time)),
        );
        let normalizer = RecordNormalizer::new(resolver);

        let transform = |row: &RawRow| -> Result<RowVerdict> {
            self.check_cancelled()?;
            let candidate = normalizer.normalize(&mapper.map(row));
            Ok(match validate(&candidate) {
                Ok(candle) => RowVerdict::Accepted(candle),
                Err(defect) => RowVerdict::Rejected(RowDefectReport {
                    source_row: candidate.source_row,
                    defect,
                }),
            })
        };

        let verdicts: Vec<RowVerdict> =
            if self.config.parallel && rows.len() >= self.config.parallel_min_rows {
                debug!("transforming {} rows in parallel", rows.len());
                rows.par_iter().map(transform).collect::<Result<_>>()?
            } else {
                rows.iter().map(transform).collect::<Result<_>>()?
            };

        let mut report = IngestReport::new(rows.len(), self.config.time.mode, &resolver);
        let mut candles = Vec::with_capacity(verdicts.len());
        for verdict in verdicts {
            match verdict {
                RowVerdict::Accepted(candle) => candles.push(candle),
                RowVerdict::Rejected(rejection) => {
                    debug!("row {} dropped: {}", rejection.source_row, rejection.defect);
                    report.record(rejection.defect);
                    if self.config.strict {
                        report.defects.push(rejection);
                    }
                }
            }
        }
        report.accepted = candles.len();

        self.check_cancelled()?;
        sort_candles(&mut candles);

        info!(
            "ingested {} rows: {} accepted, {} rejected (missing={}, non_numeric={}, unresolved_time={}), time encoding {}",
            report.rows_read,
            report.accepted,
            report.rejected(),
            report.rejected_missing_field,
            report.rejected_non_numeric,
            report.rejected_unresolved_time,
            report
                .time_encoding
                .map(|e| e.to_string())
                .unwrap_or_else(|| "range-heuristic".to_string()),
        );

        Ok(IngestOutcome { candles, report })
    }

    /// The configured delimiter overrides whatever the format carries.
    fn effective_format(&self, format: SourceFormat) -> SourceFormat {
        match format {
            SourceFormat::Delimited { delimiter } => SourceFormat::Delimited {
                delimiter: self.config.reader.delimiter.map(|c| c as u8).or(delimiter),
            },
            SourceFormat::Workbook => SourceFormat::Workbook,
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Load a file with the default configuration.
pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    Ok(IngestPipeline::new(IngestConfig::default())?
        .ingest_path(path)?
        .candles)
}

/// Load from any reader with the default configuration.
pub fn load_candles_from_reader<R: Read>(source: R, format: SourceFormat) -> Result<Vec<Candle>> {
    Ok(IngestPipeline::new(IngestConfig::default())?
        .ingest_reader(source, format)?
        .candles)
}
