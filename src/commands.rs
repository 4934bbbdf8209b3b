//! Command handlers: read the export, run the stages, write the results.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{InputArgs, NormalizeArgs, PrepareArgs, PreviewArgs, WeightArgs},
    frame::Table,
    io_utils,
    normalize::Normalizer,
    options::ConflictPolicy,
    pipeline::{PrepareConfig, RunSummary, prepare},
    table,
    weights::WeightOverrides,
};

pub fn execute_prepare(args: &PrepareArgs) -> Result<()> {
    let source = read_input(&args.input)?;
    let config = PrepareConfig {
        weights: resolve_overrides(&args.weights)?,
        cutoff_days: args.cutoff_days,
        today: args.today,
        conflict_policy: if args.strict_options {
            ConflictPolicy::Reject
        } else {
            ConflictPolicy::FirstWins
        },
    };
    let prepared = prepare(source, &config)
        .with_context(|| format!("Preparing {:?}", args.input.input))?;

    emit(
        args.output.as_deref(),
        &prepared.records,
        args.output_delimiter,
        &args.preview,
    )?;
    if let Some(path) = &args.options {
        write_output(Some(path), &prepared.options, args.output_delimiter)?;
        info!("Wrote {} option(s) to {:?}", prepared.options.len(), path);
    }
    if let Some(path) = &args.summary {
        write_summary(path, &prepared.summary)?;
    }
    Ok(())
}

pub fn execute_normalize(args: &NormalizeArgs) -> Result<()> {
    let source = read_input(&args.input)?;
    let normalizer = Normalizer::new(resolve_overrides(&args.weights)?);
    let normalized = normalizer
        .normalize(source)
        .with_context(|| format!("Normalizing {:?}", args.input.input))?;
    emit(
        args.output.as_deref(),
        &normalized.table,
        args.output_delimiter,
        &args.preview,
    )
}

fn read_input(args: &InputArgs) -> Result<Table> {
    let delimiter = io_utils::resolve_delimiter(Some(&args.input), args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Reading '{}' (delimiter '{}', encoding {})",
        args.input.display(),
        crate::printable_delimiter(delimiter),
        encoding.name()
    );
    io_utils::read_table_from_path(&args.input, delimiter, encoding)
}

/// File weights first, then `--weight` assignments on top.
fn resolve_overrides(args: &WeightArgs) -> Result<WeightOverrides> {
    let from_file = match &args.weights_file {
        Some(path) => WeightOverrides::load(path)?,
        None => WeightOverrides::default(),
    };
    let from_flags = WeightOverrides::parse_assignments(&args.weights)?;
    Ok(from_file.merged(&from_flags))
}

fn emit(
    output: Option<&Path>,
    result: &Table,
    delimiter: Option<u8>,
    preview: &PreviewArgs,
) -> Result<()> {
    if preview.preview {
        table::print_table(result, preview.rows);
        Ok(())
    } else {
        write_output(output, result, delimiter)
    }
}

fn write_output(path: Option<&Path>, result: &Table, delimiter: Option<u8>) -> Result<()> {
    let delimiter = io_utils::resolve_delimiter(path.filter(|p| !io_utils::is_dash(p)), delimiter);
    io_utils::write_table_to_path(path, result, delimiter)?;
    info!(
        "Wrote {} row(s) to {}",
        result.len(),
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating summary file {path:?}"))?;
    serde_json::to_writer_pretty(file, summary).context("Writing run summary JSON")?;
    info!("Run summary written to {:?}", path);
    Ok(())
}
