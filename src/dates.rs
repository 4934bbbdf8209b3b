//! Trailing-window date filter.
//!
//! Keeps rows dated on or after `today - cutoff_days`. There is no upper
//! bound, so future-dated rows pass. An unparseable date fails the whole
//! call instead of silently dropping the row.

use chrono::{Days, Local, NaiveDate};
use log::info;

use crate::{
    data::{Value, parse_iso_date},
    error::{PrepError, PrepResult},
    frame::Table,
    normalize::DATE_COLUMN,
};

/// Filters against the local wall-clock date.
pub fn filter_dates(table: Table, cutoff_days: u32) -> PrepResult<Table> {
    filter_dates_as_of(table, cutoff_days, Local::now().date_naive())
}

/// Earliest date kept for a window of `cutoff_days` ending at `today`.
pub fn window_start(today: NaiveDate, cutoff_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(cutoff_days)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn filter_dates_as_of(table: Table, cutoff_days: u32, today: NaiveDate) -> PrepResult<Table> {
    filter_window(table, cutoff_days, today, |idx| idx + 1)
}

/// Like [`filter_dates_as_of`], but date errors report `source_rows[idx]`
/// (the row's position in the original export) instead of its position in
/// `table`.
pub fn filter_dates_with_rows(
    table: Table,
    cutoff_days: u32,
    today: NaiveDate,
    source_rows: &[usize],
) -> PrepResult<Table> {
    filter_window(table, cutoff_days, today, |idx| {
        source_rows.get(idx).copied().unwrap_or(idx + 1)
    })
}

fn filter_window<F>(
    table: Table,
    cutoff_days: u32,
    today: NaiveDate,
    row_number: F,
) -> PrepResult<Table>
where
    F: Fn(usize) -> usize,
{
    let Some(date_idx) = table.column_index(DATE_COLUMN) else {
        return Err(PrepError::schema(format!(
            "no '{DATE_COLUMN}' column to filter on"
        )));
    };
    let start = window_start(today, cutoff_days);
    let input_rows = table.len();

    let (headers, rows) = table.into_parts();
    let mut output = Table::new(headers);
    for (idx, mut row) in rows.into_iter().enumerate() {
        let date = match &row[date_idx] {
            Some(Value::Date(date)) => *date,
            Some(other) => {
                let raw = other.as_display();
                parse_iso_date(&raw).ok_or(PrepError::InvalidDateFormat {
                    row: row_number(idx),
                    value: raw,
                })?
            }
            None => {
                return Err(PrepError::InvalidDateFormat {
                    row: row_number(idx),
                    value: String::new(),
                });
            }
        };
        if date >= start {
            row[date_idx] = Some(Value::Date(date));
            output.push_row(row);
        }
    }

    info!(
        "Kept {} of {} row(s) dated on or after {}",
        output.len(),
        input_rows,
        start
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dated(dates: &[&str]) -> Table {
        let rows = dates
            .iter()
            .enumerate()
            .map(|(idx, date)| vec![idx.to_string(), date.to_string()])
            .collect::<Vec<_>>();
        Table::from_text_rows(&["ad_id".to_string(), "date".to_string()], &rows)
    }

    fn kept_dates(table: &Table) -> Vec<String> {
        table
            .column(DATE_COLUMN)
            .unwrap()
            .map(|v| v.unwrap().as_display())
            .collect()
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let table = dated(&["2024-06-07", "2024-06-08", "2024-06-15"]);
        let filtered = filter_dates_as_of(table, 7, day(2024, 6, 15)).unwrap();
        assert_eq!(kept_dates(&filtered), vec!["2024-06-08", "2024-06-15"]);
    }

    #[test]
    fn future_rows_pass_through() {
        let table = dated(&["2024-07-01"]);
        let filtered = filter_dates_as_of(table, 0, day(2024, 6, 15)).unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn kept_dates_become_date_values() {
        let table = dated(&["2024-06-10"]);
        let filtered = filter_dates_as_of(table, 30, day(2024, 6, 15)).unwrap();
        assert_eq!(filtered.cell(0, DATE_COLUMN), Some(&Value::Date(day(2024, 6, 10))));
    }

    #[test]
    fn filtering_twice_is_a_fixed_point() {
        let today = day(2024, 6, 15);
        let table = dated(&["2024-05-01", "2024-06-09", "2024-06-14"]);
        let once = filter_dates_as_of(table, 7, today).unwrap();
        let twice = filter_dates_as_of(once.clone(), 7, today).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unparseable_date_is_reported_with_row() {
        let table = dated(&["2024-06-10", "10/06/2024"]);
        let err = filter_dates_as_of(table, 7, day(2024, 6, 15)).unwrap_err();
        assert_eq!(
            err,
            PrepError::InvalidDateFormat {
                row: 2,
                value: "10/06/2024".into()
            }
        );
    }

    #[test]
    fn unparseable_date_reports_source_row() {
        let table = dated(&["2024-06-10", "junk"]);
        let err = filter_dates_with_rows(table, 7, day(2024, 6, 15), &[4, 9]).unwrap_err();
        assert_eq!(
            err,
            PrepError::InvalidDateFormat {
                row: 9,
                value: "junk".into()
            }
        );
    }

    #[test]
    fn missing_date_column_is_a_schema_error() {
        let table = Table::from_text_rows(&["ad_id"], &[vec!["1"]]);
        assert!(matches!(
            filter_dates_as_of(table, 7, day(2024, 6, 15)),
            Err(PrepError::Schema(_))
        ));
    }

    #[test]
    fn huge_window_saturates_at_earliest_date() {
        assert_eq!(window_start(day(2024, 6, 15), u32::MAX), NaiveDate::MIN);
    }
}
