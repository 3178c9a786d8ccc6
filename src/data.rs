use std::fmt;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single cell value after cleaning. Missing cells are represented as
/// `Option<Value>::None` at the dataset level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// An in-memory tabular dataset: ordered columns, rows of optional cells.
///
/// Datasets are value types. No pipeline stage mutates one in place; every
/// transformation returns a fresh `Dataset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column in row order, missing cells skipped at the call
    /// site via the `Option`.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&Value>> {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|cell| cell.as_ref()))
    }

    /// Non-missing numeric values of one column.
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.column_values(index)
            .filter_map(|cell| cell.and_then(Value::as_number))
            .collect()
    }

    /// Non-missing date values of one column.
    pub fn date_values(&self, index: usize) -> Vec<NaiveDate> {
        self.column_values(index)
            .filter_map(|cell| cell.and_then(Value::as_date))
            .collect()
    }
}

/// Parses a date literal using the four accepted formats.
pub fn parse_flexible_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

/// Title-cases a string the way categorical values are normalized: the first
/// letter of every run of alphabetic characters is uppercased, the rest
/// lowercased. "nEW yoRK" -> "New York", "us-east" -> "Us-East".
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Human-facing label for a column name: underscores become spaces, then
/// title case. "unit_price" -> "Unit Price".
pub fn column_label(name: &str) -> String {
    title_case(&name.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parse_flexible_date_supports_four_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_flexible_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_flexible_date("05/06/2024").unwrap(), expected);
        assert_eq!(parse_flexible_date("05-06-2024").unwrap(), expected);
        assert_eq!(parse_flexible_date("2024/05/06").unwrap(), expected);
        assert!(parse_flexible_date("May 6, 2024").is_err());
    }

    #[test]
    fn title_case_matches_value_normalization() {
        assert_eq!(title_case("nEW yoRK"), "New York");
        assert_eq!(title_case("us-east"), "Us-East");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn column_label_replaces_underscores() {
        assert_eq!(column_label("unit_price"), "Unit Price");
        assert_eq!(column_label("sales"), "Sales");
    }

    #[test]
    fn value_display_trims_integral_floats() {
        assert_eq!(Value::Number(350.0).as_display(), "350");
        assert_eq!(Value::Number(3.5).as_display(), "3.5");
        assert_eq!(Value::Text("x".into()).as_display(), "x");
    }
}
