//! In-memory table shared by every preparation stage.
//!
//! A [`Table`] is a list of ordered, named columns plus rows of optional
//! cells. `None` marks a missing value (an empty field in the source export).
//! Stages take a table by value and hand back a new one, so callers never
//! observe a table being changed underneath them.

use crate::data::Value;

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builds a table from typed rows, padding short rows with missing cells
    /// and truncating long ones to the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Builds a table from raw text fields. Empty and whitespace-only fields
    /// become missing cells.
    pub fn from_text_rows<S: AsRef<str>>(headers: &[S], rows: &[Vec<S>]) -> Self {
        let headers = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|field| {
                        let field = field.as_ref();
                        (!field.trim().is_empty()).then(|| Value::Text(field.to_string()))
                    })
                    .collect()
            })
            .collect();
        Self::from_rows(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    /// Iterates a column's cells; `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&Value>> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_ref()))
    }

    pub fn rename_columns<F>(&mut self, mut rename: F)
    where
        F: FnMut(&str) -> String,
    {
        for header in &mut self.headers {
            *header = rename(header);
        }
    }

    /// Removes every named column that exists. Unknown names are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep = self
            .headers
            .iter()
            .map(|header| !names.contains(&header.as_str()))
            .collect::<Vec<_>>();
        if keep.iter().all(|k| *k) {
            return;
        }
        self.headers = retain_by_mask(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
    }

    /// Appends a column whose cells are produced per row.
    pub fn append_column<F>(&mut self, name: impl Into<String>, mut cell: F)
    where
        F: FnMut(&Row) -> Option<Value>,
    {
        self.headers.push(name.into());
        for row in &mut self.rows {
            let value = cell(row);
            row.push(value);
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.headers, self.rows)
    }

    /// Renders every cell as text; missing cells become empty strings.
    pub fn to_text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}
