//! Configuration structures for the OHLC ingest pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{CanonicalField, TimeEncodingMode, TimestampSecs};

/// Main configuration for one ingest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Header aliases per canonical field.
    pub aliases: AliasTable,
    /// Tabular reader configuration.
    pub reader: ReaderConfig,
    /// Time column resolution.
    pub time: TimeConfig,
    /// Report every rejected row, not just counts.
    pub strict: bool,
    /// Run the per-row transform on the rayon pool.
    pub parallel: bool,
    /// Minimum row count before the parallel path is used.
    pub parallel_min_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            aliases: AliasTable::default(),
            reader: ReaderConfig::default(),
            time: TimeConfig::default(),
            strict: false,
            parallel: true,
            parallel_min_rows: 4096,
        }
    }
}

impl IngestConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: IngestConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.aliases.validate()?;
        self.time.validate()?;
        if let Some(d) = self.reader.delimiter {
            if !d.is_ascii() || d == '"' || d == '\n' || d == '\r' {
                return Err(Error::config(format!(
                    "delimiter must be a single ASCII character other than quote or newline, got {d:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Ordered header aliases for each canonical field.
///
/// Lookup walks each list front to back; the first alias present in a row
/// with a non-absent value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTable {
    pub time: Vec<String>,
    pub open: Vec<String>,
    pub high: Vec<String>,
    pub low: Vec<String>,
    pub close: Vec<String>,
    pub volume: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            time: owned(&[
                "time",
                "Time",
                "TIME",
                "DATE",
                "date",
                "Date",
                "timestamp",
                "Timestamp",
                "TIMESTAMP",
                "DateTime",
                "datetime",
                "Date Time",
            ]),
            open: owned(&["open", "Open", "OPEN", "O", "o"]),
            high: owned(&["high", "High", "HIGH", "H", "h"]),
            low: owned(&["low", "Low", "LOW", "L", "l"]),
            close: owned(&["close", "Close", "CLOSE", "C", "c"]),
            volume: owned(&["volume", "Volume", "VOLUME", "Vol", "vol", "V", "v"]),
        }
    }
}

impl AliasTable {
    /// Aliases for a field, in priority order.
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Time => &self.time,
            CanonicalField::Open => &self.open,
            CanonicalField::High => &self.high,
            CanonicalField::Low => &self.low,
            CanonicalField::Close => &self.close,
            CanonicalField::Volume => &self.volume,
        }
    }

    fn aliases_mut(&mut self, field: CanonicalField) -> &mut Vec<String> {
        match field {
            CanonicalField::Time => &mut self.time,
            CanonicalField::Open => &mut self.open,
            CanonicalField::High => &mut self.high,
            CanonicalField::Low => &mut self.low,
            CanonicalField::Close => &mut self.close,
            CanonicalField::Volume => &mut self.volume,
        }
    }

    /// Append lower-priority aliases for a field, skipping ones already listed.
    pub fn with_extra<I, S>(mut self, field: CanonicalField, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.aliases_mut(field);
        for alias in extra {
            let alias = alias.into();
            if !list.contains(&alias) {
                list.push(alias);
            }
        }
        self
    }

    /// Every field must have at least one non-blank alias.
    pub fn validate(&self) -> Result<()> {
        for field in CanonicalField::ALL {
            let list = self.aliases(field);
            if list.is_empty() {
                return Err(Error::config(format!("alias list for '{field}' is empty")));
            }
            if list.iter().any(|a| a.trim().is_empty()) {
                return Err(Error::config(format!(
                    "alias list for '{field}' contains a blank alias"
                )));
            }
        }
        Ok(())
    }
}

/// Tabular reader configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Field delimiter for text input. `None` sniffs it from the header line
    /// unless the file extension implies one.
    pub delimiter: Option<char>,
}

/// Time column resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// How the file's time encoding is chosen.
    pub mode: TimeEncodingMode,
    /// Maximum number of rows inspected when sniffing.
    pub sniff_rows: usize,
    /// Confidence below which a sniffed encoding is logged as doubtful.
    pub min_confidence: f64,
    /// Earliest instant a sniffed numeric encoding may produce (Unix seconds).
    pub plausible_from: TimestampSecs,
    /// Latest instant a sniffed numeric encoding may produce (Unix seconds).
    pub plausible_until: TimestampSecs,
    /// Exclusive serial range used by [`TimeEncodingMode::RangeHeuristic`].
    pub serial_range: (f64, f64),
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            mode: TimeEncodingMode::Auto,
            sniff_rows: 64,
            min_confidence: 0.9,
            // 1980-01-01T00:00:00Z
            plausible_from: 315_532_800,
            // 2100-01-01T00:00:00Z
            plausible_until: 4_102_444_800,
            serial_range: (40_000.0, 100_000.0),
        }
    }
}

impl TimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sniff_rows == 0 {
            return Err(Error::config("sniff_rows must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.plausible_from >= self.plausible_until {
            return Err(Error::config(format!(
                "plausible window is empty: {} >= {}",
                self.plausible_from, self.plausible_until
            )));
        }
        let (lo, hi) = self.serial_range;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(Error::config(format!(
                "serial_range must be a finite, increasing pair, got ({lo}, {hi})"
            )));
        }
        Ok(())
    }
}
