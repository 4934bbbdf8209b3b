use bandit_prep::{
    ConflictPolicy, Metric, Normalizer, PrepError, PrepareConfig, Table, WeightOverrides,
    data::Value, filter_dates_as_of, io_utils, normalize, prepare, reindex_options,
};
use chrono::NaiveDate;
use encoding_rs::UTF_8;
use proptest::prelude::*;

mod common;

use common::fixture_path;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn integer(table: &Table, row: usize, column: &str) -> i64 {
    match table.cell(row, column) {
        Some(Value::Integer(value)) => *value,
        other => panic!("expected integer in {column}, got {other:?}"),
    }
}

fn float(table: &Table, row: usize, column: &str) -> f64 {
    match table.cell(row, column) {
        Some(Value::Float(value)) => *value,
        other => panic!("expected float in {column}, got {other:?}"),
    }
}

#[test]
fn impression_weight_is_inferred_from_cost_totals() {
    let table = Table::from_text_rows(
        &["ad_id", "date", "cost", "impressions"],
        &[
            vec!["1", "2024-06-10", "10", "100"],
            vec!["2", "2024-06-10", "20", "100"],
        ],
    );
    let normalized = Normalizer::default().normalize(table).unwrap();
    assert_eq!(normalized.weights.get(Metric::Impression), 15.0);
    assert_eq!(float(&normalized.table, 0, "successes"), 1500.0);
    assert_eq!(integer(&normalized.table, 0, "trials"), 1000 + 1500 + 1);
}

#[test]
fn unobserved_clicks_infer_zero_weight() {
    let table = Table::from_text_rows(
        &["ad_id", "cost", "clicks", "conversions"],
        &[vec!["1", "3", "0", "1"], vec!["2", "4", "", "1"]],
    );
    let normalized = Normalizer::default().normalize(table).unwrap();
    assert_eq!(normalized.weights.get(Metric::Click), 0.0);
    assert_eq!(normalized.weights.get(Metric::Conversion), 350.0);
}

#[test]
fn explicit_weight_drives_trials_encoding() {
    let table = Table::from_text_rows(
        &["ad_id", "date", "cost", "impressions", "clicks"],
        &[vec!["1", "2024-06-10", "5.00", "10", "0"]],
    );
    let overrides = WeightOverrides::new()
        .with(Metric::Impression, 2.0)
        .unwrap();
    let table = normalize(table, &overrides).unwrap();
    assert_eq!(float(&table, 0, "successes"), 20.0);
    assert_eq!(integer(&table, 0, "trials"), 521);
}

#[test]
fn zero_cost_row_is_absent_from_output() {
    let table = Table::from_text_rows(
        &["ad_id", "cost", "impressions"],
        &[vec!["1", "0", "900"], vec!["2", "1", "10"]],
    );
    let table = normalize(table, &WeightOverrides::new()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.cell(0, "ad_id"), Some(&Value::from("2")));
}

#[test]
fn date_window_keeps_lower_bound_only() {
    let table = Table::from_text_rows(
        &["ad_id", "date"],
        &[vec!["1", "2024-06-08"], vec!["2", "2024-06-07"]],
    );
    let filtered = filter_dates_as_of(table, 7, day(2024, 6, 15)).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered.cell(0, "ad_id"), Some(&Value::from("1")));
}

#[test]
fn options_are_deduplicated_by_ad_id() {
    let table = Table::from_text_rows(
        &["ad_id", "date", "successes", "trials"],
        &[
            vec!["42", "2024-06-10", "1", "5"],
            vec!["42", "2024-06-11", "2", "6"],
            vec!["43", "2024-06-11", "0", "3"],
        ],
    );
    let (options, records) = reindex_options(table).unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(integer(&records, 0, "option_id"), integer(&records, 1, "option_id"));
    assert_eq!(integer(&records, 2, "option_id"), 1);
    assert_eq!(integer(&options, 1, "option_id"), 1);
}

#[test]
fn facebook_fixture_runs_end_to_end() {
    let path = fixture_path("facebook_export.csv");
    let table = io_utils::read_table_from_path(&path, b',', UTF_8).expect("read fixture");
    let config = PrepareConfig {
        today: Some(day(2024, 6, 15)),
        ..PrepareConfig::new(7)
    };
    let prepared = prepare(table, &config).expect("prepare");

    assert_eq!(prepared.summary.input_rows, 6);
    assert_eq!(prepared.summary.inactive_rows, 1);
    assert_eq!(prepared.summary.incomplete_rows, 1);
    assert_eq!(prepared.summary.normalized_rows, 4);
    assert_eq!(prepared.summary.filtered_rows, 3);
    assert_eq!(
        prepared.records.headers(),
        ["date", "ad_id", "ad_name", "successes", "trials", "option_id"]
    );
    assert_eq!(
        prepared.options.to_text_rows(),
        vec![vec!["0", "1001", "Summer sale"], vec!["1", "1004", "Autumn sale"]]
    );
    let option_ids = (0..prepared.records.len())
        .map(|row| integer(&prepared.records, row, "option_id"))
        .collect::<Vec<_>>();
    assert_eq!(option_ids, vec![0, 0, 1]);
}

#[test]
fn strict_policy_rejects_conflicting_identities() {
    let table = Table::from_text_rows(
        &["ad_id", "ad_name", "date", "cost"],
        &[
            vec!["7", "Original", "2024-06-10", "1"],
            vec!["7", "Renamed", "2024-06-11", "1"],
        ],
    );
    let config = PrepareConfig {
        today: Some(day(2024, 6, 15)),
        conflict_policy: ConflictPolicy::Reject,
        ..PrepareConfig::new(30)
    };
    let err = prepare(table, &config).unwrap_err();
    assert!(matches!(err, PrepError::ConflictingOption { .. }));
}

#[test]
fn negative_override_fails_before_reading_rows() {
    let mut overrides = WeightOverrides::new();
    assert!(overrides.set(Metric::Conversion, -5.0).is_err());
    assert!(overrides.is_empty());
}

proptest! {
    #[test]
    fn normalized_rows_keep_successes_within_trials(
        rows in proptest::collection::vec(
            (0u32..50_000, 0u32..10_000, 0u32..500, 0u32..200, 0u32..20),
            1..40,
        ),
        click_weight in proptest::option::of(0.0f64..500.0),
    ) {
        let text_rows = rows
            .iter()
            .enumerate()
            .map(|(idx, (cents, imps, engs, clicks, convs))| {
                vec![
                    idx.to_string(),
                    format!("{}.{:02}", cents / 100, cents % 100),
                    imps.to_string(),
                    engs.to_string(),
                    clicks.to_string(),
                    convs.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        let headers = ["ad_id", "cost", "impressions", "engagements", "clicks", "conversions"]
            .map(String::from);
        let table = Table::from_text_rows(&headers, &text_rows);
        let mut overrides = WeightOverrides::new();
        if let Some(weight) = click_weight {
            overrides.set(Metric::Click, weight).unwrap();
        }

        let normalized = normalize(table, &overrides).unwrap();
        let active = rows.iter().filter(|(cents, ..)| *cents > 0).count();
        prop_assert_eq!(normalized.len(), active);
        for row in 0..normalized.len() {
            let successes = float(&normalized, row, "successes");
            let trials = integer(&normalized, row, "trials");
            prop_assert!(successes >= 0.0);
            prop_assert!(trials >= 1);
            prop_assert!(successes <= trials as f64);
        }
    }
}
