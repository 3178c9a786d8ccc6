use autodash::{
    clean,
    data::{Dataset, Value},
    kpi::{self, Kpi, KpiValue, Trend},
};

fn kpis_for(dataset: &Dataset) -> Vec<Kpi> {
    let cleaned = clean::clean(dataset);
    kpi::build_kpis(&cleaned.dataset, &cleaned.index)
}

fn find<'a>(kpis: &'a [Kpi], id: &str) -> Option<&'a Kpi> {
    kpis.iter().find(|k| k.id == id)
}

#[test]
fn three_row_sales_dataset_yields_sum_and_count() {
    let dataset = Dataset {
        columns: vec!["date".to_string(), "sales".to_string()],
        rows: vec![
            vec![
                Some(Value::Text("2024-01-01".into())),
                Some(Value::Text("100".into())),
            ],
            vec![
                Some(Value::Text("2024-01-02".into())),
                Some(Value::Text("200".into())),
            ],
            vec![
                Some(Value::Text("2024-01-03".into())),
                Some(Value::Text("50".into())),
            ],
        ],
    };
    let kpis = kpis_for(&dataset);
    assert_eq!(
        find(&kpis, "sum_sales").map(|k| &k.value),
        Some(&KpiValue::Number(350.0))
    );
    assert_eq!(
        find(&kpis, "count_sales").map(|k| &k.value),
        Some(&KpiValue::Number(3.0))
    );
}

#[test]
fn ratio_kpi_is_absent_when_denominator_sums_to_zero() {
    let rows: Vec<Vec<Option<Value>>> = (0..10)
        .map(|i| {
            vec![
                Some(Value::Number(i as f64 + 1.0)),
                Some(Value::Number(if i % 2 == 0 { 1.0 } else { -1.0 })),
            ]
        })
        .collect();
    let dataset = Dataset {
        columns: vec!["revenue".to_string(), "delta".to_string()],
        rows,
    };
    let kpis = kpis_for(&dataset);
    assert!(find(&kpis, "ratio_revenue_delta").is_none());
    assert!(find(&kpis, "sum_revenue").is_some());
}

#[test]
fn kpi_ids_are_unique_within_a_run() {
    let rows: Vec<Vec<Option<Value>>> = (0..20)
        .map(|i| {
            vec![
                Some(Value::Text(format!("2024-02-{:02}", i % 10 + 1))),
                Some(Value::Text(format!("2024-03-{:02}", i % 10 + 1))),
                Some(Value::Number(i as f64)),
                Some(Value::Number(100.0 - i as f64)),
                Some(Value::Text(["a", "b"][i % 2].to_string())),
            ]
        })
        .collect();
    let dataset = Dataset {
        columns: vec![
            "created_date".to_string(),
            "updated_date".to_string(),
            "units".to_string(),
            "stock".to_string(),
            "tier".to_string(),
        ],
        rows,
    };
    let kpis = kpis_for(&dataset);
    let mut ids: Vec<&str> = kpis.iter().map(|k| k.id.as_str()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    // Two date columns still yield distinct growth KPIs.
    assert!(find(&kpis, "growth_units_by_created_date").is_some());
    assert!(find(&kpis, "growth_units_by_updated_date").is_some());
}

#[test]
fn growth_kpi_trends_up_for_rising_totals() {
    let rows: Vec<Vec<Option<Value>>> = (0..6)
        .map(|i| {
            vec![
                Some(Value::Text(format!("2024-01-0{}", i + 1))),
                Some(Value::Number(10.0 * (i + 1) as f64)),
            ]
        })
        .collect();
    let dataset = Dataset {
        columns: vec!["order_date".to_string(), "sales".to_string()],
        rows,
    };
    let kpis = kpis_for(&dataset);
    let growth = find(&kpis, "growth_sales_by_order_date").expect("growth KPI");
    assert_eq!(growth.trend, Some(Trend::Up));
    assert_eq!(growth.color, "success");
}

#[test]
fn top_category_counts_occurrences() {
    let rows: Vec<Vec<Option<Value>>> = ["red", "red", "blue", "red", "blue", "red"]
        .iter()
        .enumerate()
        .map(|(i, c)| {
            vec![
                Some(Value::Number(i as f64 + 1.0)),
                Some(Value::Text(c.to_string())),
            ]
        })
        .collect();
    let dataset = Dataset {
        columns: vec!["id".to_string(), "color".to_string()],
        rows,
    };
    let kpis = kpis_for(&dataset);
    let top = find(&kpis, "top_color").expect("top_color KPI");
    assert_eq!(top.value, KpiValue::Text("Red".to_string()));
    assert!(top.description.contains("4 occurrences"));
}
