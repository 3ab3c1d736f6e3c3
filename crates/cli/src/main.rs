use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ohlc_core::{Candle, IngestConfig, SourceFormat, TimeEncodingMode};
use ohlc_ingestion::IngestPipeline;
use tracing::info;

#[derive(Parser)]
#[command(name = "ohlc-ingest")]
#[command(about = "Normalize exported OHLC files into a canonical candle series", long_about = None)]
struct Cli {
    /// Input file (.csv, .txt, .tsv, .xlsx, .xlsm, .xlsb, .xls, .ods)
    path: PathBuf,

    /// Override the format implied by the extension (csv | tsv | xlsx | ...)
    #[arg(long)]
    format: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// auto | range-heuristic | spreadsheet-serial | unix-seconds | unix-millis | date-string
    #[arg(long)]
    time_encoding: Option<TimeEncodingMode>,

    /// Field delimiter for delimited text; sniffed when omitted
    #[arg(long)]
    delimiter: Option<char>,

    /// Report every rejected row and exit non-zero if any were dropped
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<IngestConfig> {
    let mut config = match &cli.config {
        Some(path) => IngestConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => IngestConfig::default(),
    };
    if let Some(mode) = cli.time_encoding {
        config.time.mode = mode;
    }
    if cli.delimiter.is_some() {
        config.reader.delimiter = cli.delimiter;
    }
    config.strict |= cli.strict;
    Ok(config)
}

fn source_format(cli: &Cli) -> Result<SourceFormat> {
    match &cli.format {
        Some(name) => SourceFormat::from_extension(name)
            .with_context(|| format!("unknown format '{name}'. expected csv | txt | tsv | xlsx | xlsm | xlsb | xls | ods")),
        None => SourceFormat::from_path(&cli.path)
            .with_context(|| format!("detect format of {}", cli.path.display())),
    }
}

fn write_candles(cli: &Cli, candles: &[Candle]) -> Result<()> {
    let json = if cli.pretty {
        serde_json::to_string_pretty(candles)?
    } else {
        serde_json::to_string(candles)?
    };
    match &cli.output {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("write output {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("write stdout")?;
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let format = source_format(&cli)?;
    let pipeline = IngestPipeline::new(config).context("invalid configuration")?;

    let bytes = fs::read(&cli.path).with_context(|| format!("read {}", cli.path.display()))?;
    let outcome = pipeline
        .ingest_bytes(bytes, format)
        .with_context(|| format!("ingest {}", cli.path.display()))?;

    write_candles(&cli, &outcome.candles)?;
    info!("report: {}", serde_json::to_string(&outcome.report)?);

    if pipeline.config().strict && !outcome.report.is_clean() {
        let mut stderr = io::stderr().lock();
        for d in &outcome.report.defects {
            writeln!(stderr, "row {}: {}", d.source_row, d.defect)?;
        }
        writeln!(
            stderr,
            "{} of {} rows rejected",
            outcome.report.rejected(),
            outcome.report.rows_read
        )?;
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
