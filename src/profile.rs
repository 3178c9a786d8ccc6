//! Column-kind inference.
//!
//! Every column is classified exactly once per pipeline run as numeric, date,
//! categorical, or text. The rules are heuristic and implemented as pure
//! predicate functions over a raw column view so the thresholds are
//! unit-testable in isolation:
//!
//! 1. all values missing -> text
//! 2. numeric if more than 80% of present values parse as a float
//! 3. date if the column name carries a date keyword, or more than 70% of a
//!    sample of up to 10 present values match a known date pattern
//! 4. categorical if distinct/rows < 0.5 and distinct count < 50
//! 5. otherwise text

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Value};

const NUMERIC_SHARE_THRESHOLD: f64 = 0.8;
const DATE_SAMPLE_LIMIT: usize = 10;
const DATE_SAMPLE_THRESHOLD: f64 = 0.7;
const CATEGORICAL_DISTINCT_RATIO: f64 = 0.5;
const CATEGORICAL_DISTINCT_LIMIT: usize = 50;

const DATE_NAME_KEYWORDS: &[&str] = &["date", "time", "created", "updated", "timestamp"];

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}",
        r"^\d{2}/\d{2}/\d{4}",
        r"^\d{2}-\d{2}-\d{4}",
        r"^\d{4}/\d{2}/\d{2}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static date pattern"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Date,
    Categorical,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Date => "date",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Text => "text",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
}

/// Column kinds for one dataset, in declared column order. Built once per
/// run and handed to every downstream synthesizer.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    profiles: Vec<ColumnProfile>,
}

impl ColumnIndex {
    pub fn build(dataset: &Dataset) -> Self {
        let profiles = dataset
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<Option<&Value>> = dataset.column_values(idx).collect();
                ColumnProfile {
                    name: name.clone(),
                    kind: infer_kind(name, &cells),
                }
            })
            .collect();
        Self { profiles }
    }

    pub fn profiles(&self) -> &[ColumnProfile] {
        &self.profiles
    }

    pub fn kind_of(&self, index: usize) -> Option<ColumnKind> {
        self.profiles.get(index).map(|p| p.kind)
    }

    fn columns_of_kind(&self, kind: ColumnKind) -> Vec<usize> {
        self.profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == kind)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        self.columns_of_kind(ColumnKind::Numeric)
    }

    pub fn date_columns(&self) -> Vec<usize> {
        self.columns_of_kind(ColumnKind::Date)
    }

    pub fn categorical_columns(&self) -> Vec<usize> {
        self.columns_of_kind(ColumnKind::Categorical)
    }

    pub fn text_columns(&self) -> Vec<usize> {
        self.columns_of_kind(ColumnKind::Text)
    }
}

/// Classifies one column. Deterministic: same name and cells always yield
/// the same kind.
pub fn infer_kind(name: &str, cells: &[Option<&Value>]) -> ColumnKind {
    let present: Vec<&Value> = cells.iter().filter_map(|c| *c).collect();
    if present.is_empty() {
        return ColumnKind::Text;
    }
    if is_numeric_column(&present) {
        return ColumnKind::Numeric;
    }
    if is_date_column(name, &present) {
        return ColumnKind::Date;
    }
    if is_categorical_column(&present, cells.len()) {
        return ColumnKind::Categorical;
    }
    ColumnKind::Text
}

pub fn is_numeric_column(present: &[&Value]) -> bool {
    if present.is_empty() {
        return false;
    }
    let numeric = present
        .iter()
        .filter(|value| coerce_number(value).is_some())
        .count();
    numeric as f64 / present.len() as f64 > NUMERIC_SHARE_THRESHOLD
}

pub fn is_date_column(name: &str, present: &[&Value]) -> bool {
    let lowered = name.to_lowercase();
    if DATE_NAME_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return true;
    }
    let sample: Vec<&&Value> = present.iter().take(DATE_SAMPLE_LIMIT).collect();
    if sample.is_empty() {
        return false;
    }
    let matches = sample
        .iter()
        .filter(|value| match value {
            Value::Date(_) => true,
            Value::Text(s) => DATE_PATTERNS.iter().any(|p| p.is_match(s.trim())),
            Value::Number(_) => false,
        })
        .count();
    matches as f64 / sample.len() as f64 > DATE_SAMPLE_THRESHOLD
}

pub fn is_categorical_column(present: &[&Value], row_count: usize) -> bool {
    if row_count == 0 {
        return false;
    }
    let distinct: HashSet<String> = present.iter().map(|v| v.as_display()).collect();
    let ratio = distinct.len() as f64 / row_count as f64;
    ratio < CATEGORICAL_DISTINCT_RATIO && distinct.len() < CATEGORICAL_DISTINCT_LIMIT
}

/// Numeric coercion used by both inference and cleaning: numbers pass
/// through, text parses as f64 (whitespace trimmed), dates do not coerce.
/// Non-finite parses ("nan", "inf") count as missing, not numeric.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n).filter(|n| n.is_finite()),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Date(_) => None,
    }
}
