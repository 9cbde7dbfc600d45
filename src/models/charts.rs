//! Output-side data structures handed back to callers: chart series and ranking rows.
//!
//! These are plain data. JSON field names follow what chart front-ends expect, but
//! wire formatting beyond that is left to whoever calls the engines.

use serde::Serialize;

/// One labelled line of a chart, position-aligned with `ChartSeries::labels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    #[serde(rename = "data")]
    pub values: Vec<f64>,
}

impl Dataset {
    /// A dataset of `len` zeros, used when a filter matches nothing.
    pub fn zeroed(label: impl Into<String>, len: usize) -> Self {
        Self {
            label: label.into(),
            values: vec![0.0; len],
        }
    }
}

/// Time-bucketed chart data. Every dataset has exactly `labels.len()` values.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartSeries {
    /// Checks the alignment invariant; used by tests and debug assertions.
    pub fn is_aligned(&self) -> bool {
        self.datasets
            .iter()
            .all(|d| d.values.len() == self.labels.len())
    }
}

/// One ranked group for a calendar day. Rows come back sorted ascending by `rank`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRankRow {
    pub key: String,
    #[serde(rename = "avg")]
    pub average: f64,
    pub rank: u32,
    pub count: i64,
    pub date: String,
    pub metric: String,
    pub group: String,
}
