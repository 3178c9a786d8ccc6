//! Dashboard layout composition.
//!
//! Positions are grid coordinates on a 12-unit responsive grid: KPI cards
//! flow four per row at 3x1, charts two per row at 6x2 grouped by chart
//! kind, and insights stack full-width sorted by severity.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::{
    charts::{Chart, ChartKind},
    data::title_case,
    insight::Insight,
    kpi::Kpi,
};

const KPI_COLUMNS: usize = 4;
const CHART_COLUMNS: usize = 2;

const PRIORITY_KPIS: u32 = 1;
const PRIORITY_CHARTS: u32 = 2;
const PRIORITY_RECOMMENDATIONS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub data: JsonValue,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpec {
    pub columns: usize,
    pub rows: usize,
    pub gap: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: String,
    pub priority: u32,
    pub layout: GridSpec,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub sections: Vec<Section>,
    pub total_components: usize,
    pub layout_type: String,
}

/// Composes the three section groups. `total_components` always equals the
/// sum of the inputs, whether or not their sections materialize.
pub fn compose(charts: &[Chart], kpis: &[Kpi], insights: &[Insight]) -> Layout {
    let mut sections = Vec::new();
    if !kpis.is_empty() {
        sections.push(kpi_section(kpis));
    }
    sections.extend(chart_sections(charts));
    if !insights.is_empty() {
        sections.push(insight_section(insights));
    }
    Layout {
        sections,
        total_components: charts.len() + kpis.len() + insights.len(),
        layout_type: "responsive_grid".to_string(),
    }
}

/// Stable-sorts sections ascending by priority. Composition already emits
/// them in priority order, so this is a no-op unless sections were rearranged
/// downstream.
pub fn optimize(layout: &mut Layout) {
    layout.sections.sort_by_key(|s| s.priority);
}

fn kpi_section(kpis: &[Kpi]) -> Section {
    let components = kpis
        .iter()
        .enumerate()
        .map(|(i, kpi)| Component {
            id: kpi.id.clone(),
            component_type: "kpi_card".to_string(),
            data: json!(kpi),
            position: Position {
                row: i / KPI_COLUMNS,
                col: i % KPI_COLUMNS,
                width: 3,
                height: 1,
            },
        })
        .collect();
    Section {
        id: "kpi_section".to_string(),
        title: "Key Performance Indicators".to_string(),
        section_type: "kpi_grid".to_string(),
        priority: PRIORITY_KPIS,
        layout: GridSpec {
            columns: KPI_COLUMNS,
            rows: grid_rows(kpis.len(), KPI_COLUMNS),
            gap: "16px".to_string(),
        },
        components,
    }
}

/// One section per chart kind, kinds ordered by first appearance.
fn chart_sections(charts: &[Chart]) -> Vec<Section> {
    let mut kinds: Vec<ChartKind> = Vec::new();
    for chart in charts {
        if !kinds.contains(&chart.kind) {
            kinds.push(chart.kind);
        }
    }
    kinds
        .into_iter()
        .map(|kind| {
            let group: Vec<&Chart> = charts.iter().filter(|c| c.kind == kind).collect();
            let kind_name = kind_slug(kind);
            let components = group
                .iter()
                .enumerate()
                .map(|(i, chart)| Component {
                    id: format!("chart_{i}"),
                    component_type: "chart".to_string(),
                    data: json!(chart),
                    position: Position {
                        row: i / CHART_COLUMNS,
                        col: i % CHART_COLUMNS,
                        width: 6,
                        height: 2,
                    },
                })
                .collect();
            Section {
                id: format!("chart_section_{kind_name}"),
                title: format!("{} Charts", title_case(kind_name)),
                section_type: "chart_grid".to_string(),
                priority: PRIORITY_CHARTS,
                layout: GridSpec {
                    columns: CHART_COLUMNS,
                    rows: grid_rows(group.len(), CHART_COLUMNS),
                    gap: "20px".to_string(),
                },
                components,
            }
        })
        .collect()
}

fn insight_section(insights: &[Insight]) -> Section {
    let mut ordered: Vec<&Insight> = insights.iter().collect();
    // Stable sort keeps generation order within a severity tier.
    ordered.sort_by(|a, b| b.severity.score().cmp(&a.severity.score()));
    let components = ordered
        .iter()
        .enumerate()
        .map(|(i, insight)| Component {
            id: format!("recommendation_{i}"),
            component_type: "recommendation_card".to_string(),
            data: json!(insight),
            position: Position {
                row: i,
                col: 0,
                width: 12,
                height: 1,
            },
        })
        .collect();
    Section {
        id: "recommendation_section".to_string(),
        title: "Business Insights & Recommendations".to_string(),
        section_type: "recommendation_list".to_string(),
        priority: PRIORITY_RECOMMENDATIONS,
        layout: GridSpec {
            columns: 1,
            rows: insights.len(),
            gap: "12px".to_string(),
        },
        components,
    }
}

fn grid_rows(count: usize, columns: usize) -> usize {
    count.div_ceil(columns).max(1)
}

fn kind_slug(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Histogram => "histogram",
        ChartKind::Box => "box",
        ChartKind::Bar => "bar",
        ChartKind::Pie => "pie",
        ChartKind::Line => "line",
        ChartKind::Scatter => "scatter",
        ChartKind::Heatmap => "heatmap",
    }
}
