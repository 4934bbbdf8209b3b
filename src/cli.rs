use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Prepare ad-platform exports as trials/successes for bandit allocation",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize, date-filter and index options in one pass
    Prepare(PrepareArgs),
    /// Normalize an export into ad_id, date, successes and trials only
    Normalize(NormalizeArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Ad-platform export to read ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct WeightArgs {
    /// Explicit metric weight such as `click=2.5`; repeatable. Unset metrics are inferred
    #[arg(short = 'w', long = "weight", action = clap::ArgAction::Append)]
    pub weights: Vec<String>,
    /// YAML file mapping metric names to weights; `--weight` entries take precedence
    #[arg(long = "weights")]
    pub weights_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Render the result as an aligned table on stdout instead of CSV
    #[arg(long)]
    pub preview: bool,
    /// Rows to show with --preview
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Destination for per-record rows with option_id (stdout if omitted)
    #[arg(short = 'o', long = "output", conflicts_with = "preview")]
    pub output: Option<PathBuf>,
    /// Destination for the deduplicated options table
    #[arg(long = "options")]
    pub options: Option<PathBuf>,
    /// Trailing window in days; rows dated before today minus this are dropped
    #[arg(short = 'd', long = "cutoff-days")]
    pub cutoff_days: u32,
    /// Reference date for the window (YYYY-MM-DD, defaults to the local date)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,
    #[command(flatten)]
    pub weights: WeightArgs,
    /// Fail when one ad_id appears with conflicting identity columns
    #[arg(long = "strict-options")]
    pub strict_options: bool,
    /// Write a JSON run summary (row counts and resolved weights)
    #[arg(long = "summary")]
    pub summary: Option<PathBuf>,
    /// Delimiter for output files (defaults to the extension, then comma)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    #[command(flatten)]
    pub preview: PreviewArgs,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Destination CSV (stdout if omitted)
    #[arg(short = 'o', long = "output", conflicts_with = "preview")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub weights: WeightArgs,
    /// Delimiter for the output file (defaults to the extension, then comma)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    #[command(flatten)]
    pub preview: PreviewArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    crate::data::parse_iso_date(value).ok_or_else(|| format!("'{value}' is not a YYYY-MM-DD date"))
}
