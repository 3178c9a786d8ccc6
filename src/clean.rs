//! Dataset cleaning: type coercion, outlier removal, imputation, dedup.
//!
//! The cleaner produces a dataset with consistent per-column types and no
//! missing values, ready for filter/KPI/insight synthesis. Numeric values
//! outside the 1.5x IQR fence are treated as missing and imputed with the
//! column median.

use std::collections::HashSet;

use chrono::NaiveDate;
use log::debug;

use crate::{
    data::{Dataset, Value, parse_flexible_date, title_case},
    profile::{ColumnIndex, ColumnKind, coerce_number},
};

const IQR_FENCE: f64 = 1.5;

/// A cleaned dataset plus the column-kind index derived while cleaning it.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub dataset: Dataset,
    pub index: ColumnIndex,
}

/// Runs the full cleaning pipeline: per-column coercion, outlier removal,
/// imputation, then whole-row deduplication.
pub fn clean(dataset: &Dataset) -> Cleaned {
    let index = ColumnIndex::build(dataset);
    let mut columns: Vec<Vec<Option<Value>>> = (0..dataset.column_count())
        .map(|idx| {
            let kind = index.kind_of(idx).unwrap_or(ColumnKind::Text);
            clean_column(dataset, idx, kind)
        })
        .collect();

    for (idx, column) in columns.iter_mut().enumerate() {
        let kind = index.kind_of(idx).unwrap_or(ColumnKind::Text);
        impute_column(column, kind);
    }

    let mut rows: Vec<Vec<Option<Value>>> = (0..dataset.row_count())
        .map(|row_idx| {
            columns
                .iter()
                .map(|column| column.get(row_idx).cloned().flatten())
                .collect()
        })
        .collect();

    let before = rows.len();
    dedup_rows(&mut rows);
    if rows.len() < before {
        debug!("Removed {} duplicate row(s)", before - rows.len());
    }

    Cleaned {
        dataset: Dataset {
            columns: dataset.columns.clone(),
            rows,
        },
        index,
    }
}

fn clean_column(dataset: &Dataset, idx: usize, kind: ColumnKind) -> Vec<Option<Value>> {
    let cells: Vec<Option<&Value>> = dataset.column_values(idx).collect();
    match kind {
        ColumnKind::Numeric => clean_numeric(&cells),
        ColumnKind::Categorical => clean_textual(&cells, true),
        ColumnKind::Date => clean_date(&cells),
        ColumnKind::Text => clean_textual(&cells, false),
    }
}

fn clean_numeric(cells: &[Option<&Value>]) -> Vec<Option<Value>> {
    let coerced: Vec<Option<f64>> = cells
        .iter()
        .map(|cell| cell.and_then(coerce_number))
        .collect();

    let present: Vec<f64> = coerced.iter().filter_map(|v| *v).collect();
    let bounds = iqr_bounds(&present);

    coerced
        .into_iter()
        .map(|value| match (value, bounds) {
            (Some(v), Some((lower, upper))) if v < lower || v > upper => None,
            (Some(v), _) => Some(Value::Number(v)),
            (None, _) => None,
        })
        .collect()
}

fn clean_textual(cells: &[Option<&Value>], title: bool) -> Vec<Option<Value>> {
    cells
        .iter()
        .map(|cell| {
            let raw = (*cell)?.as_display();
            let trimmed = raw.trim();
            if is_missing_literal(trimmed) {
                return None;
            }
            if title {
                Some(Value::Text(title_case(trimmed)))
            } else {
                Some(Value::Text(trimmed.to_string()))
            }
        })
        .collect()
}

fn clean_date(cells: &[Option<&Value>]) -> Vec<Option<Value>> {
    cells
        .iter()
        .map(|cell| match cell {
            Some(Value::Date(d)) => Some(Value::Date(*d)),
            // Parse failures are swallowed; the value becomes missing.
            Some(other) => parse_flexible_date(&other.as_display())
                .ok()
                .map(Value::Date),
            None => None,
        })
        .collect()
}

fn is_missing_literal(trimmed: &str) -> bool {
    trimmed.is_empty() || matches!(trimmed.to_lowercase().as_str(), "nan" | "none" | "null")
}

fn impute_column(column: &mut [Option<Value>], kind: ColumnKind) {
    match kind {
        ColumnKind::Numeric => {
            let present: Vec<f64> = column
                .iter()
                .filter_map(|c| c.as_ref().and_then(Value::as_number))
                .collect();
            if let Some(median) = median(&present) {
                for cell in column.iter_mut().filter(|c| c.is_none()) {
                    *cell = Some(Value::Number(median));
                }
            }
        }
        ColumnKind::Categorical => {
            let fill = mode(column).unwrap_or_else(|| "Unknown".to_string());
            for cell in column.iter_mut().filter(|c| c.is_none()) {
                *cell = Some(Value::Text(fill.clone()));
            }
        }
        ColumnKind::Date => {
            forward_fill_dates(column);
            backward_fill_dates(column);
        }
        ColumnKind::Text => {
            for cell in column.iter_mut().filter(|c| c.is_none()) {
                *cell = Some(Value::Text("Unknown".to_string()));
            }
        }
    }
}

fn forward_fill_dates(column: &mut [Option<Value>]) {
    let mut last: Option<NaiveDate> = None;
    for cell in column.iter_mut() {
        match cell {
            Some(Value::Date(d)) => last = Some(*d),
            None => {
                if let Some(d) = last {
                    *cell = Some(Value::Date(d));
                }
            }
            Some(_) => {}
        }
    }
}

fn backward_fill_dates(column: &mut [Option<Value>]) {
    let mut next: Option<NaiveDate> = None;
    for cell in column.iter_mut().rev() {
        match cell {
            Some(Value::Date(d)) => next = Some(*d),
            None => {
                if let Some(d) = next {
                    *cell = Some(Value::Date(d));
                }
            }
            Some(_) => {}
        }
    }
}

fn dedup_rows(rows: &mut Vec<Vec<Option<Value>>>) {
    let mut seen = HashSet::new();
    rows.retain(|row| {
        let key = row
            .iter()
            .map(|cell| match cell {
                Some(v) => format!("{v:?}"),
                None => String::from("\u{0}"),
            })
            .collect::<Vec<_>>()
            .join("\u{1}");
        seen.insert(key)
    });
}

/// Median over unsorted values; None when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Linear-interpolated quantile, q in [0, 1]. None when empty.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = position - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr))
}

/// Most frequent textual value; the first-encountered value wins ties.
/// None for an all-missing column.
fn mode(column: &[Option<Value>]) -> Option<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for cell in column.iter().flatten() {
        let display = cell.as_display();
        match order.iter().position(|v| *v == display) {
            Some(idx) => counts[idx] += 1,
            None => {
                order.push(display);
                counts.push(1);
            }
        }
    }
    let best = counts.iter().enumerate().max_by(|a, b| {
        a.1.cmp(b.1)
            .then(b.0.cmp(&a.0)) // earlier index wins ties
    })?;
    Some(order[best.0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.75), Some(3.25));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn mode_breaks_ties_by_first_occurrence() {
        let column = vec![
            Some(Value::Text("b".into())),
            Some(Value::Text("a".into())),
            Some(Value::Text("a".into())),
            Some(Value::Text("b".into())),
        ];
        assert_eq!(mode(&column), Some("b".to_string()));
        assert_eq!(mode(&[None, None]), None);
    }
}
