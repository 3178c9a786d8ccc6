//! Filter descriptor synthesis and filter-state application.
//!
//! Each cleaned column yields at most one declarative UI-filter descriptor.
//! Synthesis failures are column-scoped: a column that cannot produce a
//! valid filter is omitted, never fatal. Applying a filter-state payload
//! ignores unknown columns and malformed state objects.

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    data::{Dataset, Value, column_label},
    profile::{ColumnIndex, ColumnKind},
};

const CATEGORICAL_OPTION_LIMIT: usize = 20;
const TEXT_CARDINALITY_LIMIT: usize = 50;
const RANGE_STEPS: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub count: usize,
}

/// Declarative filter spec; the `type` tag decides which fields exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterDescriptor {
    Range {
        min: f64,
        max: f64,
        current_min: f64,
        current_max: f64,
        step: f64,
        label: String,
        description: String,
    },
    Date {
        min_date: String,
        max_date: String,
        current_start: String,
        current_end: String,
        label: String,
        description: String,
    },
    Categorical {
        options: Vec<FilterOption>,
        selected: Vec<String>,
        multi_select: bool,
        label: String,
        description: String,
    },
    Text {
        placeholder: String,
        current_value: String,
        label: String,
        description: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnFilter {
    pub column: String,
    #[serde(flatten)]
    pub descriptor: FilterDescriptor,
}

/// Builds one filter per column that supports one.
pub fn synthesize_filters(dataset: &Dataset, index: &ColumnIndex) -> Vec<ColumnFilter> {
    dataset
        .columns
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let kind = index.kind_of(idx)?;
            let descriptor = match kind {
                ColumnKind::Numeric => build_range_filter(dataset, idx, name),
                ColumnKind::Date => build_date_filter(dataset, idx, name),
                ColumnKind::Categorical => build_categorical_filter(dataset, idx, name),
                ColumnKind::Text => build_text_filter(dataset, idx, name),
            }?;
            Some(ColumnFilter {
                column: name.clone(),
                descriptor,
            })
        })
        .collect()
}

fn build_range_filter(dataset: &Dataset, idx: usize, name: &str) -> Option<FilterDescriptor> {
    let values = dataset.numeric_values(idx);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let step = if max == min {
        1.0
    } else {
        (max - min) / RANGE_STEPS
    };
    Some(FilterDescriptor::Range {
        min,
        max,
        current_min: min,
        current_max: max,
        step,
        label: column_label(name),
        description: format!("Filter {name} between {min:.2} and {max:.2}"),
    })
}

fn build_date_filter(dataset: &Dataset, idx: usize, name: &str) -> Option<FilterDescriptor> {
    let dates = dataset.date_values(idx);
    let min = dates.iter().min()?.format("%Y-%m-%d").to_string();
    let max = dates.iter().max()?.format("%Y-%m-%d").to_string();
    Some(FilterDescriptor::Date {
        min_date: min.clone(),
        max_date: max.clone(),
        current_start: min.clone(),
        current_end: max.clone(),
        label: column_label(name),
        description: format!("Filter {name} between {min} and {max}"),
    })
}

fn build_categorical_filter(dataset: &Dataset, idx: usize, name: &str) -> Option<FilterDescriptor> {
    let options = value_counts(dataset, idx);
    if options.is_empty() {
        return None;
    }
    Some(FilterDescriptor::Categorical {
        options: options.into_iter().take(CATEGORICAL_OPTION_LIMIT).collect(),
        selected: Vec::new(),
        multi_select: true,
        label: column_label(name),
        description: format!("Filter {name} by category"),
    })
}

fn build_text_filter(dataset: &Dataset, idx: usize, name: &str) -> Option<FilterDescriptor> {
    // A low-cardinality text column still gets a categorical filter.
    let distinct = dataset
        .column_values(idx)
        .flatten()
        .map(Value::as_display)
        .unique()
        .count();
    if distinct == 0 {
        return None;
    }
    if distinct <= TEXT_CARDINALITY_LIMIT {
        return build_categorical_filter(dataset, idx, name);
    }
    Some(FilterDescriptor::Text {
        placeholder: format!("Search in {name}..."),
        current_value: String::new(),
        label: column_label(name),
        description: format!("Search text in {name}"),
    })
}

/// Frequencies of each distinct value, descending by count; ties keep
/// first-encountered order.
pub(crate) fn value_counts(dataset: &Dataset, idx: usize) -> Vec<FilterOption> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for value in dataset.column_values(idx).flatten() {
        let display = value.as_display();
        match order.iter().position(|v| *v == display) {
            Some(pos) => counts[pos] += 1,
            None => {
                order.push(display);
                counts.push(1);
            }
        }
    }
    let mut indices: Vec<usize> = (0..order.len()).collect();
    indices.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(a.cmp(b)));
    indices
        .into_iter()
        .map(|i| FilterOption {
            value: order[i].clone(),
            label: order[i].clone(),
            count: counts[i],
        })
        .collect()
}

/// Filter state as carried on a dashboard request. Only the `current_*`,
/// `selected`, and `current_value` fields are read.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterState {
    Range {
        #[serde(default)]
        current_min: Option<f64>,
        #[serde(default)]
        current_max: Option<f64>,
    },
    Date {
        #[serde(default)]
        current_start: Option<String>,
        #[serde(default)]
        current_end: Option<String>,
    },
    Categorical {
        #[serde(default)]
        selected: Vec<String>,
    },
    Text {
        #[serde(default)]
        current_value: String,
    },
}

/// Applies a raw filter-state payload (column name -> state object) to a
/// dataset. Unknown columns and malformed state objects are ignored.
pub fn apply_filter_payload(dataset: &Dataset, payload: &JsonValue) -> Dataset {
    let Some(map) = payload.as_object() else {
        return dataset.clone();
    };
    let mut active: Vec<(usize, FilterState)> = Vec::new();
    for (column, raw_state) in map {
        let Some(idx) = dataset.column_index(column) else {
            continue;
        };
        if let Ok(state) = serde_json::from_value::<FilterState>(raw_state.clone()) {
            active.push((idx, state));
        }
    }
    if active.is_empty() {
        return dataset.clone();
    }
    let rows = dataset
        .rows
        .iter()
        .filter(|row| {
            active.iter().all(|(idx, state)| {
                let cell = row.get(*idx).and_then(|c| c.as_ref());
                row_matches(cell, state)
            })
        })
        .cloned()
        .collect();
    Dataset {
        columns: dataset.columns.clone(),
        rows,
    }
}

fn row_matches(cell: Option<&Value>, state: &FilterState) -> bool {
    match state {
        FilterState::Range {
            current_min,
            current_max,
        } => {
            let Some(value) = cell.and_then(Value::as_number) else {
                return false;
            };
            if let Some(min) = current_min
                && value < *min
            {
                return false;
            }
            if let Some(max) = current_max
                && value > *max
            {
                return false;
            }
            true
        }
        FilterState::Date {
            current_start,
            current_end,
        } => {
            let Some(value) = cell.and_then(Value::as_date) else {
                return false;
            };
            let start = current_start.as_deref().and_then(parse_bound);
            let end = current_end.as_deref().and_then(parse_bound);
            if let Some(start) = start
                && value < start
            {
                return false;
            }
            if let Some(end) = end
                && value > end
            {
                return false;
            }
            true
        }
        FilterState::Categorical { selected } => {
            // Empty selection means no restriction.
            if selected.is_empty() {
                return true;
            }
            match cell {
                Some(value) => selected.contains(&value.as_display()),
                None => false,
            }
        }
        FilterState::Text { current_value } => {
            if current_value.is_empty() {
                return true;
            }
            match cell {
                Some(value) => value
                    .as_display()
                    .to_lowercase()
                    .contains(&current_value.to_lowercase()),
                None => false,
            }
        }
    }
}

fn parse_bound(raw: &str) -> Option<NaiveDate> {
    crate::data::parse_flexible_date(raw).ok()
}
