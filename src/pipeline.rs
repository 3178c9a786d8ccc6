//! End-to-end dashboard assembly.

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    charts::{self, Chart},
    clean,
    data::Dataset,
    filters,
    insight::{self, Insight},
    kpi::{self, Kpi},
    layout::{self, Layout},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub charts: Vec<Chart>,
    pub kpis: Vec<Kpi>,
    pub insights: Vec<Insight>,
    pub layout: Layout,
}

/// Cleans the dataset, optionally narrows it with a filter payload, and
/// synthesizes the full dashboard document. A dataset with no columns yields
/// an empty dashboard rather than an error.
pub fn generate_dashboard(dataset: &Dataset, filter_payload: Option<&JsonValue>) -> Dashboard {
    let cleaned = clean::clean(dataset);
    let (dataset, index) = match filter_payload {
        Some(payload) => {
            let narrowed = filters::apply_filter_payload(&cleaned.dataset, payload);
            let index = crate::profile::ColumnIndex::build(&narrowed);
            (narrowed, index)
        }
        None => (cleaned.dataset, cleaned.index),
    };

    let charts = charts::build_charts(&dataset, &index);
    let kpis = kpi::build_kpis(&dataset, &index);
    let insights = insight::generate_insights(&dataset, &index);
    let mut layout = layout::compose(&charts, &kpis, &insights);
    layout::optimize(&mut layout);
    info!(
        "dashboard assembled: {} charts, {} KPIs, {} insights",
        charts.len(),
        kpis.len(),
        insights.len()
    );
    Dashboard {
        charts,
        kpis,
        insights,
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use serde_json::json;

    fn sales() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..30 {
            rows.push(vec![
                Some(Value::Text(format!("2024-01-{:02}", i % 10 + 1))),
                Some(Value::Number(100.0 + i as f64)),
                Some(Value::Text(if i % 3 == 0 { "North" } else { "South" }.to_string())),
            ]);
        }
        Dataset {
            columns: vec!["order_date".into(), "sales".into(), "region".into()],
            rows,
        }
    }

    #[test]
    fn full_pipeline_produces_consistent_totals() {
        let dashboard = generate_dashboard(&sales(), None);
        assert!(!dashboard.kpis.is_empty());
        assert!(!dashboard.charts.is_empty());
        assert_eq!(
            dashboard.layout.total_components,
            dashboard.charts.len() + dashboard.kpis.len() + dashboard.insights.len()
        );
    }

    #[test]
    fn empty_dataset_yields_empty_dashboard() {
        let empty = Dataset {
            columns: Vec::new(),
            rows: Vec::new(),
        };
        let dashboard = generate_dashboard(&empty, None);
        assert!(dashboard.charts.is_empty());
        assert!(dashboard.kpis.is_empty());
        assert!(dashboard.insights.is_empty());
        assert_eq!(dashboard.layout.total_components, 0);
    }

    #[test]
    fn filter_payload_narrows_the_dashboard() {
        let unfiltered = generate_dashboard(&sales(), None);
        let payload = json!({"region": {"type": "categorical", "selected": ["North"]}});
        let filtered = generate_dashboard(&sales(), Some(&payload));
        let count_of = |d: &Dashboard| {
            d.kpis
                .iter()
                .find(|k| k.id == "count_sales")
                .and_then(|k| match k.value {
                    crate::kpi::KpiValue::Number(n) => Some(n),
                    _ => None,
                })
        };
        assert!(count_of(&filtered).unwrap() < count_of(&unfiltered).unwrap());
    }
}
