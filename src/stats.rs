//! Shared numeric helpers for the KPI synthesizer and insight engine.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::data::{Dataset, Value};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; None with fewer than two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.max(0.0).sqrt())
}

/// Pearson correlation over paired values; None when undefined (fewer than
/// two pairs or zero variance on either side).
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&xs[..n])?;
    let my = mean(&ys[..n])?;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Per-date sums of one numeric column, ordered by date. Rows missing
/// either cell are skipped.
pub fn daily_totals(dataset: &Dataset, date_idx: usize, value_idx: usize) -> Vec<(NaiveDate, f64)> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in &dataset.rows {
        let date = row
            .get(date_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_date);
        let value = row
            .get(value_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_number);
        if let (Some(date), Some(value)) = (date, value) {
            *totals.entry(date).or_insert(0.0) += value;
        }
    }
    totals.into_iter().collect()
}

/// Per-date means of one numeric column, ordered by date.
pub fn daily_means(dataset: &Dataset, date_idx: usize, value_idx: usize) -> Vec<(NaiveDate, f64)> {
    let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for row in &dataset.rows {
        let date = row
            .get(date_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_date);
        let value = row
            .get(value_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_number);
        if let (Some(date), Some(value)) = (date, value) {
            let entry = sums.entry(date).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(date, (sum, count))| (date, sum / count as f64))
        .collect()
}

/// Least-squares line fit over (0..n, ys); returns (slope, intercept).
/// None with fewer than two points.
pub fn linear_fit(ys: &[f64]) -> Option<(f64, f64)> {
    let n = ys.len();
    if n < 2 {
        return None;
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mx = mean(&xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    for i in 0..n {
        cov += (xs[i] - mx) * (ys[i] - my);
        var_x += (xs[i] - mx).powi(2);
    }
    if var_x == 0.0 {
        return None;
    }
    let slope = cov / var_x;
    Some((slope, my - slope * mx))
}

/// Signed percentage change from `from` to `to`; None on a zero base.
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    Some((to - from) / from * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_detects_perfect_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let inverted = [8.0, 6.0, 4.0, 2.0];
        let r = pearson(&xs, &inverted).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_is_undefined_for_constant_series() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn linear_fit_recovers_slope_and_intercept() {
        let ys = [3.0, 5.0, 7.0, 9.0];
        let (slope, intercept) = linear_fit(&ys).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 3.0).abs() < 1e-12);
    }

    #[test]
    fn percent_change_guards_zero_base() {
        assert_eq!(percent_change(0.0, 10.0), None);
        assert_eq!(percent_change(100.0, 150.0), Some(50.0));
    }

    #[test]
    fn std_dev_matches_sample_formula() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = std_dev(&values).unwrap();
        assert!((sd - 2.138089935299395).abs() < 1e-12);
    }
}
