//! Option indexer.
//!
//! Collapses records that share the same identity columns (everything except
//! `date`, `trials` and `successes`) into options, numbered densely from zero
//! in first-seen order, and tags every record with its `option_id`.

use std::collections::HashMap;

use itertools::Itertools;
use log::{info, warn};

use crate::{
    data::Value,
    error::{PrepError, PrepResult},
    frame::{Row, Table},
    normalize::{DATE_COLUMN, ID_COLUMN, SUCCESSES_COLUMN, TRIALS_COLUMN},
};

pub const OPTION_ID_COLUMN: &str = "option_id";

const NON_IDENTITY_COLUMNS: [&str; 3] = [DATE_COLUMN, TRIALS_COLUMN, SUCCESSES_COLUMN];

/// How to handle one `ad_id` appearing with different identity attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Bind every record to the first option carrying its `ad_id`.
    #[default]
    FirstWins,
    /// Fail with [`PrepError::ConflictingOption`].
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct OptionIndexer {
    policy: ConflictPolicy,
}

impl OptionIndexer {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Returns `(options, records)`.
    pub fn reindex(&self, table: Table) -> PrepResult<(Table, Table)> {
        let Some(id_idx) = table.column_index(ID_COLUMN) else {
            return Err(PrepError::schema(format!(
                "no '{ID_COLUMN}' column to index options by"
            )));
        };
        let identity = table
            .headers()
            .iter()
            .positions(|header| !NON_IDENTITY_COLUMNS.contains(&header.as_str()))
            .collect_vec();

        let mut option_headers = vec![OPTION_ID_COLUMN.to_string()];
        option_headers.extend(identity.iter().map(|idx| table.headers()[*idx].clone()));
        let mut options = Table::new(option_headers);

        let mut seen_identities: HashMap<Vec<Option<String>>, usize> = HashMap::new();
        let mut by_ad_id: HashMap<Option<String>, usize> = HashMap::new();
        let mut conflicts = 0usize;

        for row in table.rows() {
            let key = identity_key(row, &identity);
            if seen_identities.contains_key(&key) {
                continue;
            }
            let option_id = options.len();
            seen_identities.insert(key, option_id);

            let ad_id = row[id_idx].as_ref().map(Value::as_display);
            if by_ad_id.contains_key(&ad_id) {
                if self.policy == ConflictPolicy::Reject {
                    return Err(PrepError::ConflictingOption {
                        ad_id: ad_id.unwrap_or_default(),
                    });
                }
                conflicts += 1;
            } else {
                by_ad_id.insert(ad_id, option_id);
            }

            let mut option_row: Row = vec![Some(Value::Integer(option_id as i64))];
            option_row.extend(identity.iter().map(|idx| row[*idx].clone()));
            options.push_row(option_row);
        }
        if conflicts > 0 {
            warn!(
                "{conflicts} option(s) share an ad_id with an earlier option; \
                 their records were bound to the first match"
            );
        }

        let mut records = table;
        records.append_column(OPTION_ID_COLUMN, |row| {
            let ad_id = row[id_idx].as_ref().map(Value::as_display);
            by_ad_id
                .get(&ad_id)
                .map(|option_id| Value::Integer(*option_id as i64))
        });

        info!(
            "Indexed {} record(s) into {} option(s)",
            records.len(),
            options.len()
        );
        Ok((options, records))
    }
}

fn identity_key(row: &Row, identity: &[usize]) -> Vec<Option<String>> {
    identity
        .iter()
        .map(|idx| row[*idx].as_ref().map(Value::as_display))
        .collect()
}

/// Indexes options with the default first-match policy.
pub fn reindex_options(table: Table) -> PrepResult<(Table, Table)> {
    OptionIndexer::default().reindex(table)
}
