//! Normalizer → DateFilter → OptionIndexer.

use chrono::{Local, NaiveDate};
use log::info;
use serde::Serialize;

use crate::{
    dates::{filter_dates_with_rows, window_start},
    error::{PrepError, PrepResult, Stage},
    frame::Table,
    normalize::Normalizer,
    options::{ConflictPolicy, OptionIndexer},
    weights::{MetricWeights, WeightOverrides},
};

#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub weights: WeightOverrides,
    pub cutoff_days: u32,
    /// Reference date for the cutoff window; `None` uses the local clock.
    pub today: Option<NaiveDate>,
    pub conflict_policy: ConflictPolicy,
}

impl PrepareConfig {
    pub fn new(cutoff_days: u32) -> Self {
        Self {
            weights: WeightOverrides::default(),
            cutoff_days,
            today: None,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input_rows: usize,
    pub inactive_rows: usize,
    pub incomplete_rows: usize,
    pub normalized_rows: usize,
    pub filtered_rows: usize,
    pub options: usize,
    pub cutoff_days: u32,
    pub as_of: NaiveDate,
    pub window_start: NaiveDate,
    pub weights: MetricWeights,
}

#[derive(Debug, Clone)]
pub struct Prepared {
    pub options: Table,
    pub records: Table,
    pub summary: RunSummary,
}

pub fn prepare(table: Table, config: &PrepareConfig) -> PrepResult<Prepared> {
    let input_rows = table.len();
    let normalized = Normalizer::new(config.weights.clone()).normalize(table)?;
    if normalized.table.is_empty() {
        return Err(PrepError::EmptyResult {
            stage: Stage::Normalize,
        });
    }
    let normalized_rows = normalized.table.len();

    let today = config.today.unwrap_or_else(|| Local::now().date_naive());
    let filtered = filter_dates_with_rows(
        normalized.table,
        config.cutoff_days,
        today,
        &normalized.source_rows,
    )?;
    if filtered.is_empty() {
        return Err(PrepError::EmptyResult {
            stage: Stage::DateFilter,
        });
    }
    let filtered_rows = filtered.len();

    let (options, records) = OptionIndexer::new(config.conflict_policy).reindex(filtered)?;
    let summary = RunSummary {
        input_rows,
        inactive_rows: normalized.inactive_rows,
        incomplete_rows: normalized.incomplete_rows,
        normalized_rows,
        filtered_rows,
        options: options.len(),
        cutoff_days: config.cutoff_days,
        as_of: today,
        window_start: window_start(today, config.cutoff_days),
        weights: normalized.weights,
    };
    info!(
        "Prepared {} record(s) across {} option(s) from {} input row(s)",
        summary.filtered_rows, summary.options, summary.input_rows
    );
    Ok(Prepared {
        options,
        records,
        summary,
    })
}
