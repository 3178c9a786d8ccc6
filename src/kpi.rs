//! KPI synthesis.
//!
//! Enumerates every applicable (column, metric) combination over the cleaned
//! dataset and emits one KPI card per combination. Every per-combination
//! builder returns `Option`: a zero denominator, an empty column, or too few
//! distinct dates simply yields no card.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Dataset, Value, column_label},
    profile::ColumnIndex,
    stats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum KpiValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kpi {
    pub id: String,
    pub title: String,
    pub value: KpiValue,
    pub format: String,
    pub description: String,
    pub trend: Option<Trend>,
    pub color: String,
}

/// Builds all applicable KPIs. Ids are unique by construction: every id is
/// derived from the metric kind plus the participating column name(s).
pub fn build_kpis(dataset: &Dataset, index: &ColumnIndex) -> Vec<Kpi> {
    let numeric = index.numeric_columns();
    let categorical = index.categorical_columns();
    let dates = index.date_columns();
    let mut kpis = Vec::new();

    for &col in &numeric {
        kpis.extend(sum_kpi(dataset, col));
        kpis.extend(average_kpi(dataset, col));
        kpis.extend(count_kpi(dataset, col));
    }
    for &cat in &categorical {
        kpis.extend(top_category_kpi(dataset, cat));
        for &num in &numeric {
            kpis.extend(category_sum_kpi(dataset, cat, num));
        }
    }
    for &date in &dates {
        for &num in &numeric {
            kpis.extend(growth_kpi(dataset, date, num));
            kpis.extend(period_change_kpi(dataset, date, num));
        }
    }
    if numeric.len() >= 2 {
        kpis.extend(ratio_kpi(dataset, numeric[0], numeric[1]));
    }
    for &col in &numeric {
        kpis.extend(percentage_kpi(dataset, col));
    }
    kpis
}

fn sum_kpi(dataset: &Dataset, col: usize) -> Option<Kpi> {
    let name = &dataset.columns[col];
    let values = dataset.numeric_values(col);
    if values.is_empty() {
        return None;
    }
    Some(Kpi {
        id: format!("sum_{name}"),
        title: format!("Total {}", column_label(name)),
        value: KpiValue::Number(values.iter().sum()),
        format: "number".to_string(),
        description: format!("Sum of all {name} values"),
        trend: None,
        color: "primary".to_string(),
    })
}

fn average_kpi(dataset: &Dataset, col: usize) -> Option<Kpi> {
    let name = &dataset.columns[col];
    let mean = stats::mean(&dataset.numeric_values(col))?;
    Some(Kpi {
        id: format!("avg_{name}"),
        title: format!("Average {}", column_label(name)),
        value: KpiValue::Number(mean),
        format: "number".to_string(),
        description: format!("Average of {name} values"),
        trend: None,
        color: "info".to_string(),
    })
}

fn count_kpi(dataset: &Dataset, col: usize) -> Option<Kpi> {
    let name = &dataset.columns[col];
    Some(Kpi {
        id: format!("count_{name}"),
        title: "Total Records".to_string(),
        value: KpiValue::Number(dataset.row_count() as f64),
        format: "number".to_string(),
        description: "Total number of records".to_string(),
        trend: None,
        color: "success".to_string(),
    })
}

fn top_category_kpi(dataset: &Dataset, col: usize) -> Option<Kpi> {
    let name = &dataset.columns[col];
    let (top_value, top_count) = top_by_frequency(dataset, col)?;
    Some(Kpi {
        id: format!("top_{name}"),
        title: format!("Top {}", column_label(name)),
        value: KpiValue::Text(top_value),
        format: "text".to_string(),
        description: format!("Most common {name} ({top_count} occurrences)"),
        trend: None,
        color: "warning".to_string(),
    })
}

fn category_sum_kpi(dataset: &Dataset, cat: usize, num: usize) -> Option<Kpi> {
    let cat_name = &dataset.columns[cat];
    let num_name = &dataset.columns[num];
    let mut sums: Vec<(String, f64)> = Vec::new();
    for row in &dataset.rows {
        let category = row.get(cat).and_then(|c| c.as_ref()).map(Value::as_display);
        let value = row
            .get(num)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_number);
        if let (Some(category), Some(value)) = (category, value) {
            match sums.iter_mut().find(|(c, _)| *c == category) {
                Some((_, sum)) => *sum += value,
                None => sums.push((category, value)),
            }
        }
    }
    let (top_category, top_sum) = sums
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    Some(Kpi {
        id: format!("sum_{num_name}_by_{cat_name}"),
        title: format!(
            "Top {} by {}",
            column_label(cat_name),
            column_label(num_name)
        ),
        value: KpiValue::Text(top_category),
        format: "text".to_string(),
        description: format!("Category with highest {num_name} sum ({top_sum:.2})"),
        trend: None,
        color: "primary".to_string(),
    })
}

fn growth_kpi(dataset: &Dataset, date: usize, num: usize) -> Option<Kpi> {
    let date_name = &dataset.columns[date];
    let num_name = &dataset.columns[num];
    let totals = stats::daily_totals(dataset, date, num);
    if totals.len() < 2 {
        return None;
    }
    let first = totals.first()?.1;
    let last = totals.last()?.1;
    let growth = stats::percent_change(first, last)?;
    Some(Kpi {
        id: format!("growth_{num_name}_by_{date_name}"),
        title: format!("{} Growth", column_label(num_name)),
        value: KpiValue::Text(format!("{growth:.1}%")),
        format: "percentage".to_string(),
        description: "Growth rate from first to last date".to_string(),
        trend: Some(if growth > 0.0 { Trend::Up } else { Trend::Down }),
        color: if growth > 0.0 { "success" } else { "danger" }.to_string(),
    })
}

fn period_change_kpi(dataset: &Dataset, date: usize, num: usize) -> Option<Kpi> {
    let date_name = &dataset.columns[date];
    let num_name = &dataset.columns[num];
    let mid = median_date(dataset, date)?;

    let mut first_period = 0.0;
    let mut second_period = 0.0;
    let mut distinct: BTreeMap<NaiveDate, ()> = BTreeMap::new();
    for row in &dataset.rows {
        let row_date = row
            .get(date)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_date);
        let value = row
            .get(num)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_number);
        if let (Some(row_date), Some(value)) = (row_date, value) {
            distinct.insert(row_date, ());
            if row_date < mid {
                first_period += value;
            } else {
                second_period += value;
            }
        }
    }
    if distinct.len() < 2 {
        return None;
    }
    let change = stats::percent_change(first_period, second_period)?;
    Some(Kpi {
        id: format!("period_change_{num_name}_by_{date_name}"),
        title: format!("{} Period Change", column_label(num_name)),
        value: KpiValue::Text(format!("{change:.1}%")),
        format: "percentage".to_string(),
        description: "Change from first half to second half of period".to_string(),
        trend: Some(if change > 0.0 { Trend::Up } else { Trend::Down }),
        color: if change > 0.0 { "success" } else { "danger" }.to_string(),
    })
}

fn ratio_kpi(dataset: &Dataset, first: usize, second: usize) -> Option<Kpi> {
    let first_name = &dataset.columns[first];
    let second_name = &dataset.columns[second];
    let numerator: f64 = dataset.numeric_values(first).iter().sum();
    let denominator: f64 = dataset.numeric_values(second).iter().sum();
    if denominator == 0.0 {
        return None;
    }
    let ratio = numerator / denominator;
    Some(Kpi {
        id: format!("ratio_{first_name}_{second_name}"),
        title: format!(
            "{} / {}",
            column_label(first_name),
            column_label(second_name)
        ),
        value: KpiValue::Text(format!("{ratio:.2}")),
        format: "ratio".to_string(),
        description: format!("Ratio of {first_name} to {second_name}"),
        trend: None,
        color: "info".to_string(),
    })
}

fn percentage_kpi(dataset: &Dataset, col: usize) -> Option<Kpi> {
    let name = &dataset.columns[col];
    let values = dataset.numeric_values(col);
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return None;
    }
    let avg_percentage = stats::mean(
        &values
            .iter()
            .map(|v| v / total * 100.0)
            .collect::<Vec<_>>(),
    )?;
    Some(Kpi {
        id: format!("percentage_{name}"),
        title: format!("Average {} %", column_label(name)),
        value: KpiValue::Text(format!("{avg_percentage:.1}%")),
        format: "percentage".to_string(),
        description: format!("Average percentage contribution of {name}"),
        trend: None,
        color: "secondary".to_string(),
    })
}

fn top_by_frequency(dataset: &Dataset, col: usize) -> Option<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for value in dataset.column_values(col).flatten() {
        let display = value.as_display();
        match order.iter().position(|v| *v == display) {
            Some(pos) => counts[pos] += 1,
            None => {
                order.push(display);
                counts.push(1);
            }
        }
    }
    let best = counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    Some((order[best.0].clone(), *best.1))
}

/// Upper-middle date of the ordered per-row date multiset; splits the period
/// comparison into `< mid` and `>= mid` halves.
fn median_date(dataset: &Dataset, date: usize) -> Option<NaiveDate> {
    let mut dates = dataset.date_values(date);
    if dates.is_empty() {
        return None;
    }
    dates.sort();
    Some(dates[dates.len() / 2])
}
