use std::path::PathBuf;

use serde_json::json;

use autodash::{
    clean,
    data::Dataset,
    filters::{self, FilterDescriptor},
    io_utils,
};

const SALES_DATA: &str = "sales.csv";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn cleaned_sales() -> clean::Cleaned {
    let dataset = io_utils::read_dataset(&fixture_path(SALES_DATA), b',').expect("load fixture");
    clean::clean(&dataset)
}

#[test]
fn every_fixture_column_gets_a_filter() {
    let cleaned = cleaned_sales();
    let filters = filters::synthesize_filters(&cleaned.dataset, &cleaned.index);
    let columns: Vec<&str> = filters.iter().map(|f| f.column.as_str()).collect();
    assert_eq!(
        columns,
        vec!["order_date", "sales", "quantity", "region", "product"]
    );
}

#[test]
fn range_filter_spans_the_observed_values() {
    let cleaned = cleaned_sales();
    let filters = filters::synthesize_filters(&cleaned.dataset, &cleaned.index);
    let sales = filters.iter().find(|f| f.column == "sales").expect("sales filter");
    match &sales.descriptor {
        FilterDescriptor::Range {
            min,
            max,
            current_min,
            current_max,
            step,
            ..
        } => {
            assert_eq!(*min, 100.0);
            assert_eq!(*max, 330.0);
            assert_eq!(*current_min, *min);
            assert_eq!(*current_max, *max);
            assert!((step - 2.3).abs() < 1e-9);
        }
        other => panic!("expected range filter, got {other:?}"),
    }
}

#[test]
fn categorical_options_order_by_descending_count() {
    let cleaned = cleaned_sales();
    let filters = filters::synthesize_filters(&cleaned.dataset, &cleaned.index);
    let region = filters.iter().find(|f| f.column == "region").expect("region filter");
    match &region.descriptor {
        FilterDescriptor::Categorical { options, selected, multi_select, .. } => {
            assert_eq!(options[0].value, "North");
            assert_eq!(options[0].count, 12);
            assert!(selected.is_empty());
            assert!(multi_select);
        }
        other => panic!("expected categorical filter, got {other:?}"),
    }
}

#[test]
fn default_filter_state_keeps_every_row() {
    let cleaned = cleaned_sales();
    let payload = json!({
        "sales": {"type": "range", "current_min": 100.0, "current_max": 330.0},
        "region": {"type": "categorical", "selected": []},
    });
    let narrowed = filters::apply_filter_payload(&cleaned.dataset, &payload);
    assert_eq!(narrowed.row_count(), cleaned.dataset.row_count());
}

#[test]
fn range_state_narrows_rows() {
    let cleaned = cleaned_sales();
    let payload = json!({
        "sales": {"type": "range", "current_min": 200.0, "current_max": 330.0},
    });
    let narrowed = filters::apply_filter_payload(&cleaned.dataset, &payload);
    assert_eq!(narrowed.row_count(), 14);
}

#[test]
fn date_state_narrows_rows() {
    let cleaned = cleaned_sales();
    let payload = json!({
        "order_date": {
            "type": "date",
            "current_start": "2024-01-10",
            "current_end": "2024-01-12",
        },
    });
    let narrowed = filters::apply_filter_payload(&cleaned.dataset, &payload);
    assert_eq!(narrowed.row_count(), 6);
}

#[test]
fn unknown_columns_and_malformed_entries_are_ignored() {
    let cleaned = cleaned_sales();
    let payload = json!({
        "no_such_column": {"type": "range", "current_min": 0.0},
        "sales": "not an object",
    });
    let narrowed = filters::apply_filter_payload(&cleaned.dataset, &payload);
    assert_eq!(narrowed.row_count(), cleaned.dataset.row_count());
}

#[test]
fn filtering_an_empty_dataset_is_a_noop() {
    let empty = Dataset {
        columns: vec!["a".to_string()],
        rows: Vec::new(),
    };
    let payload = json!({"a": {"type": "text", "current_value": "x"}});
    let narrowed = filters::apply_filter_payload(&empty, &payload);
    assert_eq!(narrowed.row_count(), 0);
}
