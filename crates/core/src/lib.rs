//! Core types and configuration for the OHLC ingest pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Canonical candles and raw decoded rows
//! - Time encodings and source formats
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{AliasTable, IngestConfig, ReaderConfig, TimeConfig};
pub use error::{Error, ParsePosition, Result};
pub use types::*;
