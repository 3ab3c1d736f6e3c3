//! Market-data file ingestion.
//!
//! This crate handles:
//! - Reading delimited text and spreadsheet workbooks into header-keyed rows
//! - Mapping exporter-specific headers onto canonical OHLC fields
//! - Resolving time columns (spreadsheet serials, epochs, date strings)
//! - Dropping defective rows and ordering the result by time

pub mod mapper;
pub mod normalizer;
pub mod pipeline;
pub mod reader;
pub mod sorter;
pub mod time;
pub mod validator;

pub use mapper::{FieldMapper, MappedRow};
pub use normalizer::{CandidateRecord, RecordNormalizer};
pub use pipeline::{
    load_candles, load_candles_from_reader, CancelToken, IngestOutcome, IngestPipeline,
    IngestReport,
};
pub use reader::{read_source, read_table};
pub use sorter::sort_candles;
pub use time::{sniff_encoding, EncodingGuess, TimeResolver};
pub use validator::{validate, RowDefect, RowDefectReport};
