pub mod cli;
pub mod commands;
pub mod data;
pub mod dates;
pub mod error;
pub mod frame;
pub mod io_utils;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod table;
pub mod weights;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    dates::{filter_dates, filter_dates_as_of, filter_dates_with_rows},
    error::{PrepError, PrepResult},
    frame::Table,
    normalize::{Normalizer, normalize},
    options::{ConflictPolicy, OptionIndexer, reindex_options},
    pipeline::{PrepareConfig, Prepared, prepare},
    weights::{Metric, WeightOverrides},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bandit_prep", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Prepare(args) => commands::execute_prepare(&args),
        Commands::Normalize(args) => commands::execute_normalize(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
