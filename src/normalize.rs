//! Normalizer: maps a raw platform export onto `ad_id`, `date`, `successes`
//! and `trials`.
//!
//! Column names are canonicalized (lowercase, whitespace joined with `_`) and
//! passed through a fixed alias table so Facebook and Google exports land on
//! the same schema. Rows with zero cost never ran and are excluded before
//! weights are inferred. Every surviving row satisfies
//! `0 <= successes < trials`.

use std::{collections::HashMap, sync::OnceLock};

use log::{debug, info};
use regex::Regex;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    data::{Value, canonical_column_name, value_to_amount},
    error::{PrepError, PrepResult},
    frame::{Row, Table},
    weights::{Metric, MetricTotals, MetricWeights, WeightOverrides},
};

pub const ID_COLUMN: &str = "ad_id";
pub const DATE_COLUMN: &str = "date";
pub const COST_COLUMN: &str = "cost";
pub const SUCCESSES_COLUMN: &str = "successes";
pub const TRIALS_COLUMN: &str = "trials";

/// Cost followed by the four outcome metrics, in [`Metric::ALL`] order.
const AMOUNT_COLUMNS: [&str; 5] = [
    COST_COLUMN,
    "impressions",
    "engagements",
    "clicks",
    "conversions",
];

const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("reporting_ends", DATE_COLUMN),
    ("day", DATE_COLUMN),
    ("post_engagement", "engagements"),
    ("link_clicks", "clicks"),
    ("purchases", "conversions"),
];

const DROPPED_COLUMNS: &[&str] = &["reporting_starts", "currency"];

fn spend_pattern() -> &'static Regex {
    static SPEND: OnceLock<Regex> = OnceLock::new();
    SPEND.get_or_init(|| {
        Regex::new(r"^amount_spent_\([a-z]{3}\)$").expect("spend column pattern compiles")
    })
}

/// Canonical name for a source header after lowercasing and aliasing.
pub fn canonical_header(header: &str) -> String {
    let name = canonical_column_name(header);
    if spend_pattern().is_match(&name) {
        return COST_COLUMN.to_string();
    }
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(name)
}

/// Renames every column to its canonical name and drops the known
/// extraneous ones. Two source columns landing on the same name is a schema
/// error rather than a silent overwrite.
pub fn canonicalize_columns(mut table: Table) -> PrepResult<Table> {
    let original = table.headers().to_vec();
    table.rename_columns(canonical_header);
    table.drop_columns(DROPPED_COLUMNS);

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in table.headers().iter().enumerate() {
        if let Some(previous) = seen.insert(name.as_str(), idx) {
            return Err(PrepError::schema(format!(
                "columns #{} and #{} both resolve to '{name}'",
                previous + 1,
                idx + 1
            )));
        }
    }
    debug!(
        "Canonical columns {:?} (source {:?})",
        table.headers(),
        original
    );
    Ok(table)
}

#[derive(Debug, Clone, Copy)]
struct RowAmounts {
    cost: Decimal,
    cents: i64,
    counts: [f64; 4],
}

impl RowAmounts {
    fn read(row: &Row, positions: &[Option<usize>; 5], row_number: usize) -> PrepResult<Self> {
        let mut amounts = [Decimal::ZERO; 5];
        let columns = AMOUNT_COLUMNS.iter().zip(positions);
        for (slot, (column, position)) in amounts.iter_mut().zip(columns) {
            let Some(value) = position.and_then(|idx| row[idx].as_ref()) else {
                continue;
            };
            *slot = value_to_amount(value).ok_or_else(|| PrepError::InvalidNumber {
                column: column.to_string(),
                row: row_number,
                value: value.as_display(),
            })?;
        }
        let cost = amounts[0];
        let cents = cost
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.floor().to_i64())
            .ok_or_else(|| PrepError::InvalidNumber {
                column: COST_COLUMN.to_string(),
                row: row_number,
                value: cost.to_string(),
            })?;
        let mut counts = [0.0; 4];
        for (count, amount) in counts.iter_mut().zip(&amounts[1..]) {
            *count = amount.to_f64().unwrap_or_default();
        }
        Ok(Self {
            cost,
            cents,
            counts,
        })
    }

    /// Cents plus successes plus one; successes are rounded up so trials
    /// stay integral and strictly above successes. `None` when the sum does
    /// not fit in an `i64`.
    fn trials(&self, successes: f64) -> Option<i64> {
        let rounded = successes.ceil();
        if !rounded.is_finite() || rounded >= i64::MAX as f64 {
            return None;
        }
        self.cents.checked_add(rounded as i64)?.checked_add(1)
    }
}

/// Output of a normalizer run.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub table: Table,
    pub weights: MetricWeights,
    pub inactive_rows: usize,
    pub incomplete_rows: usize,
    /// 1-based data row in the source export for each row of `table`.
    pub source_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    overrides: WeightOverrides,
}

impl Normalizer {
    pub fn new(overrides: WeightOverrides) -> Self {
        Self { overrides }
    }

    pub fn normalize(&self, table: Table) -> PrepResult<Normalized> {
        self.overrides.validate()?;
        let table = canonicalize_columns(table)?;
        if !table.has_column(ID_COLUMN) {
            return Err(PrepError::schema(format!(
                "no '{ID_COLUMN}' column after aliasing (columns: {})",
                table.headers().join(", ")
            )));
        }

        let positions = AMOUNT_COLUMNS.map(|column| table.column_index(column));
        for (column, position) in AMOUNT_COLUMNS.iter().zip(&positions) {
            if position.is_none() {
                debug!("Column '{column}' absent; treating it as all zero");
            }
        }
        let (headers, rows) = table.into_parts();
        let input_rows = rows.len();

        let mut totals = MetricTotals::default();
        let mut active = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            let amounts = RowAmounts::read(&row, &positions, idx + 1)?;
            if amounts.cost.is_zero() {
                continue;
            }
            totals.add(amounts.cost.to_f64().unwrap_or_default(), &amounts.counts);
            active.push((idx + 1, row, amounts));
        }
        let inactive_rows = input_rows - active.len();

        let weights = self.overrides.resolve(&totals)?;
        for metric in Metric::ALL {
            debug!("Weight {metric} = {}", weights.get(metric));
        }

        let keep = headers
            .iter()
            .map(|header| !AMOUNT_COLUMNS.contains(&header.as_str()))
            .collect::<Vec<_>>();
        let mut output_headers = headers
            .into_iter()
            .zip(&keep)
            .filter_map(|(header, keep)| keep.then_some(header))
            .collect::<Vec<_>>();
        output_headers.push(SUCCESSES_COLUMN.to_string());
        output_headers.push(TRIALS_COLUMN.to_string());

        let mut output = Table::new(output_headers);
        let mut incomplete_rows = 0usize;
        let mut source_rows = Vec::with_capacity(active.len());
        for (row_number, row, amounts) in active {
            let mut cells = row
                .into_iter()
                .zip(&keep)
                .filter_map(|(cell, keep)| keep.then_some(cell))
                .collect::<Row>();
            if cells.iter().any(Option::is_none) {
                incomplete_rows += 1;
                continue;
            }
            let successes = weights.successes(&amounts.counts);
            let trials = amounts
                .trials(successes)
                .ok_or(PrepError::TrialsOverflow { row: row_number })?;
            cells.push(Some(Value::Float(successes)));
            cells.push(Some(Value::Integer(trials)));
            output.push_row(cells);
            source_rows.push(row_number);
        }

        info!(
            "Normalized {} of {} row(s) ({} inactive, {} incomplete)",
            output.len(),
            input_rows,
            inactive_rows,
            incomplete_rows
        );
        Ok(Normalized {
            table: output,
            weights,
            inactive_rows,
            incomplete_rows,
            source_rows,
        })
    }
}

/// Normalizes `table` with the given explicit weights, inferring the rest.
pub fn normalize(table: Table, overrides: &WeightOverrides) -> PrepResult<Table> {
    Normalizer::new(overrides.clone())
        .normalize(table)
        .map(|normalized| normalized.table)
}
