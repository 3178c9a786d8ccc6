//! Declarative chart descriptors.
//!
//! No plotting backend is involved; each descriptor carries its type, a
//! title, and the already-aggregated series as plain JSON so a renderer can
//! draw it without touching the dataset again.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::{clean, data::Dataset, filters::value_counts, profile::ColumnIndex, stats};

const HISTOGRAM_BINS: usize = 30;
const BAR_TOP_VALUES: usize = 10;
const PIE_TOP_VALUES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Histogram,
    Box,
    Bar,
    Pie,
    Line,
    Scatter,
    Heatmap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub data: JsonValue,
}

/// Builds every chart the column mix supports, in a fixed order: numeric
/// (histogram, box, then one scatter), categorical (bar, pie), time series
/// (line per date column), and finally a correlation heatmap.
pub fn build_charts(dataset: &Dataset, index: &ColumnIndex) -> Vec<Chart> {
    let numeric = index.numeric_columns();
    let categorical = index.categorical_columns();
    let dates = index.date_columns();
    let mut charts = Vec::new();

    for &col in &numeric {
        charts.extend(histogram(dataset, col));
        charts.extend(box_plot(dataset, col));
    }
    if numeric.len() >= 2 {
        charts.extend(scatter(dataset, numeric[0], numeric[1]));
    }
    for &col in &categorical {
        charts.extend(bar_chart(dataset, col));
        charts.extend(pie_chart(dataset, col));
    }
    if let Some(&num) = numeric.first() {
        for &date in &dates {
            charts.extend(line_chart(dataset, date, num));
        }
    }
    if numeric.len() >= 2 {
        charts.extend(correlation_heatmap(dataset, &numeric));
    }
    charts
}

fn histogram(dataset: &Dataset, col: usize) -> Option<Chart> {
    let name = &dataset.columns[col];
    let values = dataset.numeric_values(col);
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min {
        (max - min) / HISTOGRAM_BINS as f64
    } else {
        1.0
    };
    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for v in &values {
        let bin = (((v - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }
    let edges: Vec<f64> = (0..=HISTOGRAM_BINS)
        .map(|i| min + width * i as f64)
        .collect();
    Some(Chart {
        kind: ChartKind::Histogram,
        title: format!("Distribution of {name}"),
        data: json!({
            "column": name,
            "bin_edges": edges,
            "counts": counts,
        }),
    })
}

fn box_plot(dataset: &Dataset, col: usize) -> Option<Chart> {
    let name = &dataset.columns[col];
    let mut values = dataset.numeric_values(col);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let q1 = clean::quantile(&values, 0.25)?;
    let median = clean::quantile(&values, 0.5)?;
    let q3 = clean::quantile(&values, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;
    let whisker_low = values
        .iter()
        .copied()
        .find(|v| *v >= low_fence)
        .unwrap_or(q1);
    let whisker_high = values
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= high_fence)
        .unwrap_or(q3);
    let outliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();
    Some(Chart {
        kind: ChartKind::Box,
        title: format!("Box Plot of {name}"),
        data: json!({
            "column": name,
            "q1": q1,
            "median": median,
            "q3": q3,
            "whisker_low": whisker_low,
            "whisker_high": whisker_high,
            "outliers": outliers,
        }),
    })
}

fn bar_chart(dataset: &Dataset, col: usize) -> Option<Chart> {
    let name = &dataset.columns[col];
    let counts = value_counts(dataset, col);
    if counts.is_empty() {
        return None;
    }
    let top: Vec<_> = counts.into_iter().take(BAR_TOP_VALUES).collect();
    Some(Chart {
        kind: ChartKind::Bar,
        title: format!("Top 10 Values in {name}"),
        data: json!({
            "column": name,
            "labels": top.iter().map(|o| o.value.clone()).collect::<Vec<_>>(),
            "counts": top.iter().map(|o| o.count).collect::<Vec<_>>(),
        }),
    })
}

fn pie_chart(dataset: &Dataset, col: usize) -> Option<Chart> {
    let name = &dataset.columns[col];
    let counts = value_counts(dataset, col);
    if counts.is_empty() {
        return None;
    }
    let top: Vec<_> = counts.into_iter().take(PIE_TOP_VALUES).collect();
    Some(Chart {
        kind: ChartKind::Pie,
        title: format!("Distribution of {name}"),
        data: json!({
            "column": name,
            "labels": top.iter().map(|o| o.value.clone()).collect::<Vec<_>>(),
            "values": top.iter().map(|o| o.count).collect::<Vec<_>>(),
        }),
    })
}

fn line_chart(dataset: &Dataset, date: usize, num: usize) -> Option<Chart> {
    let date_name = &dataset.columns[date];
    let value_name = &dataset.columns[num];
    let means = stats::daily_means(dataset, date, num);
    if means.is_empty() {
        return None;
    }
    Some(Chart {
        kind: ChartKind::Line,
        title: format!("{value_name} Over Time"),
        data: json!({
            "date_column": date_name,
            "value_column": value_name,
            "dates": means
                .iter()
                .map(|(d, _)| d.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>(),
            "values": means.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
        }),
    })
}

fn scatter(dataset: &Dataset, x: usize, y: usize) -> Option<Chart> {
    let x_name = &dataset.columns[x];
    let y_name = &dataset.columns[y];
    let points: Vec<(f64, f64)> = dataset
        .rows
        .iter()
        .filter_map(|row| {
            let xv = row.get(x).and_then(|c| c.as_ref()).and_then(|v| v.as_number())?;
            let yv = row.get(y).and_then(|c| c.as_ref()).and_then(|v| v.as_number())?;
            Some((xv, yv))
        })
        .collect();
    if points.is_empty() {
        return None;
    }
    Some(Chart {
        kind: ChartKind::Scatter,
        title: format!("{x_name} vs {y_name}"),
        data: json!({
            "x_column": x_name,
            "y_column": y_name,
            "x": points.iter().map(|p| p.0).collect::<Vec<_>>(),
            "y": points.iter().map(|p| p.1).collect::<Vec<_>>(),
        }),
    })
}

fn correlation_heatmap(dataset: &Dataset, numeric: &[usize]) -> Option<Chart> {
    let names: Vec<String> = numeric
        .iter()
        .map(|&i| dataset.columns[i].clone())
        .collect();
    let mut matrix = vec![vec![JsonValue::Null; numeric.len()]; numeric.len()];
    for (i, &a) in numeric.iter().enumerate() {
        for (j, &b) in numeric.iter().enumerate() {
            let pairs: Vec<(f64, f64)> = dataset
                .rows
                .iter()
                .filter_map(|row| {
                    let x = row.get(a).and_then(|c| c.as_ref()).and_then(|v| v.as_number())?;
                    let y = row.get(b).and_then(|c| c.as_ref()).and_then(|v| v.as_number())?;
                    Some((x, y))
                })
                .collect();
            let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let r = if i == j {
                Some(1.0)
            } else {
                stats::pearson(&xs, &ys)
            };
            if let Some(r) = r {
                matrix[i][j] = json!(r);
            }
        }
    }
    Some(Chart {
        kind: ChartKind::Heatmap,
        title: "Correlation Heatmap".to_string(),
        data: json!({
            "columns": names,
            "matrix": matrix,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn dataset() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..20 {
            rows.push(vec![
                Some(Value::Number(i as f64)),
                Some(Value::Number(100.0 - i as f64)),
                Some(Value::Text(if i % 2 == 0 { "A" } else { "B" }.to_string())),
            ]);
        }
        Dataset {
            columns: vec!["amount".into(), "score".into(), "grade".into()],
            rows,
        }
    }

    #[test]
    fn builds_expected_chart_kinds() {
        let data = dataset();
        let index = crate::profile::ColumnIndex::build(&data);
        let charts = build_charts(&data, &index);
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChartKind::Histogram));
        assert!(kinds.contains(&ChartKind::Box));
        assert!(kinds.contains(&ChartKind::Scatter));
        assert!(kinds.contains(&ChartKind::Bar));
        assert!(kinds.contains(&ChartKind::Pie));
        assert!(kinds.contains(&ChartKind::Heatmap));
    }

    #[test]
    fn histogram_counts_cover_every_value() {
        let data = dataset();
        let chart = histogram(&data, 0).unwrap();
        let total: u64 = chart.data["counts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_u64().unwrap())
            .sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn box_plot_quartiles_are_ordered() {
        let data = dataset();
        let chart = box_plot(&data, 0).unwrap();
        let q1 = chart.data["q1"].as_f64().unwrap();
        let median = chart.data["median"].as_f64().unwrap();
        let q3 = chart.data["q3"].as_f64().unwrap();
        assert!(q1 <= median && median <= q3);
    }

    #[test]
    fn constant_column_histogram_lands_in_one_bin() {
        let data = Dataset {
            columns: vec!["flat".into()],
            rows: (0..5).map(|_| vec![Some(Value::Number(7.0))]).collect(),
        };
        let chart = histogram(&data, 0).unwrap();
        let counts = chart.data["counts"].as_array().unwrap();
        assert_eq!(counts[0].as_u64().unwrap(), 5);
    }

    #[test]
    fn charts_survive_cleaning() {
        let cleaned = clean::clean(&dataset());
        let charts = build_charts(&cleaned.dataset, &cleaned.index);
        assert!(!charts.is_empty());
    }
}
