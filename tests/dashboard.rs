use std::path::PathBuf;

use serde_json::json;

use autodash::{
    io_utils,
    kpi::{KpiValue, Trend},
    pipeline::{self, Dashboard},
};

const SALES_DATA: &str = "sales.csv";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn sales_dashboard() -> Dashboard {
    let dataset = io_utils::read_dataset(&fixture_path(SALES_DATA), b',').expect("load fixture");
    pipeline::generate_dashboard(&dataset, None)
}

fn kpi_number(dashboard: &Dashboard, id: &str) -> f64 {
    let kpi = dashboard
        .kpis
        .iter()
        .find(|k| k.id == id)
        .unwrap_or_else(|| panic!("missing KPI {id}"));
    match kpi.value {
        KpiValue::Number(n) => n,
        KpiValue::Text(ref t) => panic!("expected number for {id}, got {t:?}"),
    }
}

#[test]
fn sales_kpis_carry_the_aggregates() {
    let dashboard = sales_dashboard();
    assert_eq!(kpi_number(&dashboard, "sum_sales"), 5160.0);
    assert_eq!(kpi_number(&dashboard, "count_sales"), 24.0);
    assert_eq!(kpi_number(&dashboard, "avg_sales"), 215.0);
    let top_region = dashboard
        .kpis
        .iter()
        .find(|k| k.id == "top_region")
        .expect("top_region KPI");
    match top_region.value {
        KpiValue::Text(ref t) => assert_eq!(t, "North"),
        _ => panic!("expected text value"),
    }
}

#[test]
fn growth_kpi_reflects_rising_daily_totals() {
    let dashboard = sales_dashboard();
    let growth = dashboard
        .kpis
        .iter()
        .find(|k| k.id == "growth_sales_by_order_date")
        .expect("growth KPI");
    assert_eq!(growth.trend, Some(Trend::Up));
    let rate = match growth.value {
        KpiValue::Text(ref t) => t
            .strip_suffix('%')
            .and_then(|n| n.parse::<f64>().ok())
            .unwrap_or_else(|| panic!("expected percentage, got {t:?}")),
        KpiValue::Number(_) => panic!("expected formatted percentage"),
    };
    assert!(rate > 0.0);
}

#[test]
fn layout_totals_are_consistent() {
    let dashboard = sales_dashboard();
    let placed: usize = dashboard
        .layout
        .sections
        .iter()
        .map(|s| s.components.len())
        .sum();
    assert_eq!(dashboard.layout.total_components, placed);
    assert_eq!(
        placed,
        dashboard.charts.len() + dashboard.kpis.len() + dashboard.insights.len()
    );
    let priorities: Vec<u32> = dashboard.layout.sections.iter().map(|s| s.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted);
}

#[test]
fn insights_include_a_trend_for_rising_sales() {
    let dashboard = sales_dashboard();
    let trend = dashboard
        .insights
        .iter()
        .find(|i| i.title == "Sales Trend Analysis")
        .expect("sales trend insight");
    assert!(trend.description.contains("increasing"));
}

#[test]
fn dashboards_are_deterministic() {
    let first = serde_json::to_value(sales_dashboard()).expect("serialize");
    let second = serde_json::to_value(sales_dashboard()).expect("serialize");
    assert_eq!(first, second);
}

#[test]
fn filtered_dashboard_shrinks_counts() {
    let dataset = io_utils::read_dataset(&fixture_path(SALES_DATA), b',').expect("load fixture");
    let payload = json!({"region": {"type": "categorical", "selected": ["South"]}});
    let dashboard = pipeline::generate_dashboard(&dataset, Some(&payload));
    assert_eq!(kpi_number(&dashboard, "count_sales"), 6.0);
}
