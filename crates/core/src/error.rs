//! Error types for the OHLC ingest pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Where in the source a decode failure happened, as far as the decoder knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsePosition {
    /// Byte offset from the start of the stream.
    pub byte: Option<u64>,
    /// 1-based line number.
    pub line: Option<u64>,
    /// 0-based record (row) index.
    pub record: Option<u64>,
}

impl fmt::Display for ParsePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(b) = self.byte {
            parts.push(format!("byte {b}"));
        }
        if let Some(l) = self.line {
            parts.push(format!("line {l}"));
        }
        if let Some(r) = self.record {
            parts.push(format!("record {r}"));
        }
        if parts.is_empty() {
            f.write_str("unknown position")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

fn position_suffix(position: &Option<ParsePosition>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

/// Main error type for the ingest pipeline.
///
/// Row-level defects are not errors; see the ingestion report instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The source stream could not be read to completion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source does not decode into a table.
    #[error("Parse error{}: {}", position_suffix(.position), .message)]
    Parse {
        message: String,
        position: Option<ParsePosition>,
    },

    /// The file extension maps to no known format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run was cancelled before producing output.
    #[error("Ingest cancelled")]
    Cancelled,
}

impl Error {
    /// Create a parse error without position information.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse {
            message: msg.into(),
            position: None,
        }
    }

    /// Create a parse error at a known position.
    pub fn parse_at(msg: impl Into<String>, position: ParsePosition) -> Self {
        Error::Parse {
            message: msg.into(),
            position: Some(position),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
