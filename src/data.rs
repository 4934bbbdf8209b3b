use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single typed cell. Missing cells are represented as `None` by the
/// surrounding `Option<Value>`, never by an empty `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// Lowercases a header and joins its whitespace-separated words with `_`.
pub fn canonical_column_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parses a non-negative exact amount. `None` means the text is not a usable
/// number (unparseable or negative).
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(Decimal::ZERO);
    }
    let parsed = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()?;
    if parsed.is_sign_negative() && !parsed.is_zero() {
        None
    } else {
        Some(parsed)
    }
}

/// Converts an already-typed cell into an amount, following the same rules
/// as [`parse_amount`] for text.
pub fn value_to_amount(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Text(s) => return parse_amount(s),
        Value::Integer(i) => Decimal::from(*i),
        Value::Float(f) => Decimal::try_from(*f).ok()?,
        Value::Date(_) => return None,
    };
    if parsed.is_sign_negative() && !parsed.is_zero() {
        None
    } else {
        Some(parsed)
    }
}
