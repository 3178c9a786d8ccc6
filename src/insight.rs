//! Statistical insight generation.
//!
//! Five independent analyses run over the cleaned dataset: trend, anomaly,
//! correlation, segmentation, and forecast. Each analysis is fail-soft and
//! emits at most one insight per applicable column combination; the engine
//! concatenates everything without deduplication or cross-ranking. Ranking
//! is the layout composer's job.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::{
    data::{Dataset, column_label},
    profile::ColumnIndex,
    stats,
};

const STRONG_CHANGE_PERCENT: f64 = 20.0;
const MODERATE_CHANGE_PERCENT: f64 = 10.0;
const ANOMALY_Z_THRESHOLD: f64 = 2.0;
const CORRELATION_THRESHOLD: f64 = 0.7;
const SEGMENT_COUNT: usize = 3;
const SEGMENT_MIN_ROWS: usize = 10;
const FORECAST_MIN_DAYS: usize = 7;
const FORECAST_HORIZON: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Anomaly,
    Correlation,
    Segmentation,
    Forecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn score(&self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    fn from_change(change_percent: f64) -> Self {
        if change_percent.abs() > STRONG_CHANGE_PERCENT {
            Severity::High
        } else if change_percent.abs() > MODERATE_CHANGE_PERCENT {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub severity: Severity,
    pub data: JsonValue,
}

/// Runs every analysis and concatenates their outputs.
pub fn generate_insights(dataset: &Dataset, index: &ColumnIndex) -> Vec<Insight> {
    let numeric = index.numeric_columns();
    let categorical = index.categorical_columns();
    let dates = index.date_columns();
    let mut insights = Vec::new();

    for &date in &dates {
        for &num in &numeric {
            insights.extend(analyze_trend(dataset, date, num));
        }
    }
    for &col in &numeric {
        insights.extend(detect_anomalies(dataset, col));
    }
    if numeric.len() >= 2 {
        insights.extend(analyze_correlations(dataset, &numeric));
    }
    if !categorical.is_empty() && numeric.len() >= 2 {
        insights.extend(segment(dataset, &numeric));
    }
    for &date in &dates {
        for &num in &numeric {
            insights.extend(forecast(dataset, date, num));
        }
    }
    insights
}

fn analyze_trend(dataset: &Dataset, date: usize, num: usize) -> Option<Insight> {
    let name = &dataset.columns[num];
    let totals = stats::daily_totals(dataset, date, num);
    if totals.len() < 3 {
        return None;
    }
    let values: Vec<f64> = totals.iter().map(|(_, v)| *v).collect();
    let half = values.len() / 2;
    let first_half = stats::mean(&values[..half])?;
    let second_half = stats::mean(&values[half..])?;

    let direction = if second_half > first_half {
        "increasing"
    } else {
        "decreasing"
    };
    let change = stats::percent_change(first_half, second_half).unwrap_or(0.0);
    let strength = change_strength(change);
    Some(Insight {
        kind: InsightKind::Trend,
        title: format!("{} Trend Analysis", column_label(name)),
        description: format!(
            "The {name} shows a {strength} {direction} trend with {:.1}% change",
            change.abs()
        ),
        recommendation: trend_recommendation(direction, strength, name),
        severity: Severity::from_change(change),
        data: json!({
            "trend_direction": direction,
            "change_percentage": change,
            "strength": strength,
        }),
    })
}

fn detect_anomalies(dataset: &Dataset, col: usize) -> Option<Insight> {
    let name = &dataset.columns[col];
    let values = dataset.numeric_values(col);
    let mean = stats::mean(&values)?;
    let std_dev = stats::std_dev(&values)?;
    if std_dev == 0.0 {
        return None;
    }
    let anomalies: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| ((v - mean) / std_dev).abs() > ANOMALY_Z_THRESHOLD)
        .collect();
    if anomalies.is_empty() {
        return None;
    }
    let percentage = anomalies.len() as f64 / values.len() as f64 * 100.0;
    let severity = if percentage > 10.0 {
        Severity::High
    } else if percentage > 5.0 {
        Severity::Medium
    } else {
        Severity::Low
    };
    let max_anomaly = anomalies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_anomaly = anomalies.iter().copied().fold(f64::INFINITY, f64::min);
    Some(Insight {
        kind: InsightKind::Anomaly,
        title: format!("Anomaly Detection in {}", column_label(name)),
        description: format!(
            "Found {} anomalies ({percentage:.1}% of data) in {name}",
            anomalies.len()
        ),
        recommendation: anomaly_recommendation(percentage, name),
        severity,
        data: json!({
            "anomaly_count": anomalies.len(),
            "anomaly_percentage": percentage,
            "max_anomaly_value": max_anomaly,
            "min_anomaly_value": min_anomaly,
        }),
    })
}

fn analyze_correlations(dataset: &Dataset, numeric: &[usize]) -> Option<Insight> {
    let mut strong: Vec<(String, String, f64)> = Vec::new();
    for (i, &a) in numeric.iter().enumerate() {
        for &b in &numeric[i + 1..] {
            let pairs = paired_values(dataset, a, b);
            let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            if let Some(r) = stats::pearson(&xs, &ys)
                && r.abs() > CORRELATION_THRESHOLD
            {
                strong.push((dataset.columns[a].clone(), dataset.columns[b].clone(), r));
            }
        }
    }
    if strong.is_empty() {
        return None;
    }
    // Stable sort keeps column order as the tie break.
    strong.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
    let (col1, col2, r) = strong[0].clone();
    Some(Insight {
        kind: InsightKind::Correlation,
        title: "Strong Correlation Detected".to_string(),
        description: format!("Strong correlation ({r:.2}) between {col1} and {col2}"),
        recommendation: correlation_recommendation(&col1, &col2, r),
        severity: Severity::Medium,
        data: json!({
            "strong_correlations": strong
                .iter()
                .map(|(a, b, r)| json!({"col1": a, "col2": b, "correlation": r}))
                .collect::<Vec<_>>(),
            "total_correlations_analyzed": strong.len(),
        }),
    })
}

fn segment(dataset: &Dataset, numeric: &[usize]) -> Option<Insight> {
    let feature_cols = [numeric[0], numeric[1]];
    let points = paired_values(dataset, feature_cols[0], feature_cols[1]);
    if points.len() <= SEGMENT_MIN_ROWS {
        return None;
    }
    let scaled = standardize(&points)?;
    let assignments = kmeans(&scaled, SEGMENT_COUNT)?;

    let mut segments = Vec::new();
    for cluster in 0..SEGMENT_COUNT {
        let members: Vec<&(f64, f64)> = points
            .iter()
            .zip(&assignments)
            .filter(|(_, a)| **a == cluster)
            .map(|(p, _)| p)
            .collect();
        let size = members.len();
        let mean_x = stats::mean(&members.iter().map(|p| p.0).collect::<Vec<_>>()).unwrap_or(0.0);
        let mean_y = stats::mean(&members.iter().map(|p| p.1).collect::<Vec<_>>()).unwrap_or(0.0);
        let name_x = dataset.columns[feature_cols[0]].as_str();
        let name_y = dataset.columns[feature_cols[1]].as_str();
        segments.push(json!({
            "cluster_id": cluster,
            "size": size,
            "percentage": size as f64 / points.len() as f64 * 100.0,
            "avg_values": { name_x: mean_x, name_y: mean_y },
        }));
    }
    let largest_pct = segments
        .iter()
        .filter_map(|s| s["percentage"].as_f64())
        .fold(f64::NEG_INFINITY, f64::max);
    Some(Insight {
        kind: InsightKind::Segmentation,
        title: "Customer Segmentation Analysis".to_string(),
        description: format!("Identified {SEGMENT_COUNT} distinct customer segments"),
        recommendation: format!(
            "Largest segment represents {largest_pct:.1}% of customers. Focus marketing efforts on this segment."
        ),
        severity: Severity::Medium,
        data: json!({
            "segments": segments,
            "features_used": [
                dataset.columns[feature_cols[0]],
                dataset.columns[feature_cols[1]],
            ],
        }),
    })
}

fn forecast(dataset: &Dataset, date: usize, num: usize) -> Option<Insight> {
    let name = &dataset.columns[num];
    let totals = stats::daily_totals(dataset, date, num);
    if totals.len() < FORECAST_MIN_DAYS {
        return None;
    }
    let values: Vec<f64> = totals.iter().map(|(_, v)| *v).collect();
    let (slope, intercept) = stats::linear_fit(&values)?;
    let projected: Vec<f64> = (values.len()..values.len() + FORECAST_HORIZON)
        .map(|x| slope * x as f64 + intercept)
        .collect();
    let current_avg = stats::mean(&values)?;
    let forecast_avg = stats::mean(&projected)?;
    let change = stats::percent_change(current_avg, forecast_avg).unwrap_or(0.0);
    Some(Insight {
        kind: InsightKind::Forecast,
        title: format!("{} Forecast", column_label(name)),
        description: format!(
            "Projected {change:.1}% change in {name} over next {FORECAST_HORIZON} days"
        ),
        recommendation: forecast_recommendation(change, name),
        severity: Severity::from_change(change),
        data: json!({
            "forecast_change": change,
            "current_average": current_avg,
            "forecast_average": forecast_avg,
            "forecast_period": format!("{FORECAST_HORIZON} days"),
        }),
    })
}

/// Rows where both columns are present and numeric.
fn paired_values(dataset: &Dataset, a: usize, b: usize) -> Vec<(f64, f64)> {
    dataset
        .rows
        .iter()
        .filter_map(|row| {
            let x = row
                .get(a)
                .and_then(|c| c.as_ref())
                .and_then(crate::data::Value::as_number)?;
            let y = row
                .get(b)
                .and_then(|c| c.as_ref())
                .and_then(crate::data::Value::as_number)?;
            Some((x, y))
        })
        .collect()
}

/// Zero-mean unit-variance scaling per feature. None if either feature has
/// zero variance.
fn standardize(points: &[(f64, f64)]) -> Option<Vec<(f64, f64)>> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let (mx, my) = (stats::mean(&xs)?, stats::mean(&ys)?);
    let (sx, sy) = (stats::std_dev(&xs)?, stats::std_dev(&ys)?);
    if sx == 0.0 || sy == 0.0 {
        return None;
    }
    Some(
        points
            .iter()
            .map(|(x, y)| ((x - mx) / sx, (y - my) / sy))
            .collect(),
    )
}

/// Deterministic 3-means: initial centroids are drawn from quantile
/// positions of the points ordered by the first feature, then standard
/// Lloyd iterations until assignments stop changing (at most 100 rounds).
fn kmeans(points: &[(f64, f64)], k: usize) -> Option<Vec<usize>> {
    if points.len() < k {
        return None;
    }
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .0
            .total_cmp(&points[b].0)
            .then(points[a].1.total_cmp(&points[b].1))
    });
    let mut centroids: Vec<(f64, f64)> = (0..k)
        .map(|i| {
            let pos = (2 * i + 1) * points.len() / (2 * k);
            points[order[pos.min(points.len() - 1)]]
        })
        .collect();

    let mut assignments = vec![0usize; points.len()];
    for _ in 0..100 {
        let mut changed = false;
        for (idx, point) in points.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    squared_distance(point, a).total_cmp(&squared_distance(point, b))
                })
                .map(|(i, _)| i)?;
            if assignments[idx] != nearest {
                assignments[idx] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&(f64, f64)> = points
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == cluster)
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                continue;
            }
            centroid.0 = members.iter().map(|p| p.0).sum::<f64>() / members.len() as f64;
            centroid.1 = members.iter().map(|p| p.1).sum::<f64>() / members.len() as f64;
        }
    }
    Some(assignments)
}

fn squared_distance(a: &(f64, f64), b: &(f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

fn change_strength(change: f64) -> &'static str {
    if change.abs() > STRONG_CHANGE_PERCENT {
        "strong"
    } else if change.abs() > MODERATE_CHANGE_PERCENT {
        "moderate"
    } else {
        "weak"
    }
}

fn trend_recommendation(direction: &str, strength: &str, column: &str) -> String {
    match (direction, strength) {
        ("increasing", "strong") => format!(
            "Strong growth in {column}. Consider scaling up operations and marketing efforts."
        ),
        ("increasing", _) => format!(
            "Moderate growth in {column}. Monitor performance and consider targeted improvements."
        ),
        (_, "strong") => format!(
            "Significant decline in {column}. Investigate root causes and implement corrective actions."
        ),
        _ => format!("Moderate decline in {column}. Review strategies and consider optimization."),
    }
}

fn anomaly_recommendation(percentage: f64, column: &str) -> String {
    if percentage > 10.0 {
        format!("High anomaly rate in {column}. Investigate data quality and business processes.")
    } else if percentage > 5.0 {
        format!("Moderate anomalies detected in {column}. Review data collection methods.")
    } else {
        format!("Low anomaly rate in {column}. Data quality appears good.")
    }
}

fn correlation_recommendation(col1: &str, col2: &str, r: f64) -> String {
    if r > 0.8 {
        format!(
            "Very strong positive correlation between {col1} and {col2}. Consider combining these metrics."
        )
    } else if r > 0.7 {
        format!("Strong correlation between {col1} and {col2}. Monitor both metrics together.")
    } else {
        format!("Moderate correlation between {col1} and {col2}. Analyze relationship further.")
    }
}

fn forecast_recommendation(change: f64, column: &str) -> String {
    if change > 20.0 {
        format!("Strong projected growth in {column}. Prepare for increased demand and capacity.")
    } else if change > 10.0 {
        format!("Moderate growth expected in {column}. Plan for gradual scaling.")
    } else if change < -20.0 {
        format!(
            "Significant decline projected in {column}. Investigate causes and implement recovery strategies."
        )
    } else if change < -10.0 {
        format!("Moderate decline expected in {column}. Review strategies and optimize operations.")
    } else {
        format!("Stable forecast for {column}. Maintain current strategies and monitor performance.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_tiers_follow_change_magnitude() {
        assert_eq!(Severity::from_change(25.0), Severity::High);
        assert_eq!(Severity::from_change(-25.0), Severity::High);
        assert_eq!(Severity::from_change(15.0), Severity::Medium);
        assert_eq!(Severity::from_change(5.0), Severity::Low);
    }

    #[test]
    fn kmeans_is_deterministic() {
        let points: Vec<(f64, f64)> = (0..30)
            .map(|i| {
                let base = (i % 3) as f64 * 10.0;
                (base + (i as f64 * 0.01), base - (i as f64 * 0.02))
            })
            .collect();
        let first = kmeans(&points, 3).unwrap();
        let second = kmeans(&points, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn kmeans_separates_obvious_clusters() {
        let mut points = Vec::new();
        for i in 0..5 {
            points.push((0.0 + i as f64 * 0.1, 0.0));
            points.push((10.0 + i as f64 * 0.1, 10.0));
            points.push((20.0 + i as f64 * 0.1, 20.0));
        }
        let assignments = kmeans(&points, 3).unwrap();
        // All members of one spatial cluster share one label.
        for chunk_start in [0usize, 1, 2] {
            let labels: Vec<usize> = (0..5)
                .map(|i| assignments[chunk_start + 3 * i])
                .collect();
            assert!(labels.iter().all(|l| *l == labels[0]));
        }
    }
}
