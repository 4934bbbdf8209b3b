//! Aligned plain-text rendering used by `--preview`.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::frame::Table;

/// Renders at most `limit` rows of `table` as space-aligned columns under a
/// dashed separator.
pub fn render_table(table: &Table, limit: usize) -> String {
    let headers = table.headers();
    let rows = table
        .to_text_rows()
        .into_iter()
        .take(limit)
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &rule_widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    if table.len() > rows.len() {
        let _ = writeln!(output, "... {} more row(s)", table.len() - rows.len());
    }
    output
}

pub fn print_table(table: &Table, limit: usize) {
    print!("{}", render_table(table, limit));
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = single_line(cell);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
