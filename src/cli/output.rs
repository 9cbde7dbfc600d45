//! Terminal rendering of engine results: `comfy-table` tables or JSON.

use crate::error::Result;
use crate::models::{ChartSeries, DailyRankRow, Metric};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Renders a chart with one row per label and one column per dataset.
///
/// With `only_nonzero`, rows where every dataset is zero are left out (used for the
/// 366-day heatmap).
pub fn chart_table(chart: &ChartSeries, metric: Metric, only_nonzero: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Bucket")];
    header.extend(chart.datasets.iter().map(|d| Cell::new(&d.label).fg(Color::Cyan)));
    table.set_header(header);

    for (i, label) in chart.labels.iter().enumerate() {
        let values: Vec<f64> = chart
            .datasets
            .iter()
            .map(|d| d.values.get(i).copied().unwrap_or(0.0))
            .collect();
        if only_nonzero && values.iter().all(|v| *v == 0.0) {
            continue;
        }
        let mut row = vec![Cell::new(label)];
        row.extend(
            values
                .iter()
                .map(|v| value_cell(*v, metric).set_alignment(CellAlignment::Right)),
        );
        table.add_row(row);
    }
    table
}

fn value_cell(value: f64, metric: Metric) -> Cell {
    if value == 0.0 {
        return Cell::new("-").fg(Color::DarkGrey);
    }
    let cell = Cell::new(format!("{:.2}", value));
    if !matches!(metric, Metric::Pm25) {
        return cell;
    }
    // Thai PCD PM2.5 bands.
    match value {
        v if v <= 25.0 => cell.fg(Color::Green),
        v if v <= 37.5 => cell.fg(Color::Yellow),
        v if v <= 75.0 => cell.fg(Color::DarkYellow),
        _ => cell.fg(Color::Red),
    }
}

pub fn ranking_table(rows: &[DailyRankRow], metric: Metric) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Rank"),
            Cell::new("Key"),
            Cell::new(format!("Avg {} {}", metric, metric.unit()).trim_end()),
            Cell::new("Samples"),
        ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.rank).set_alignment(CellAlignment::Right),
            Cell::new(&row.key),
            value_cell(row.average, metric).set_alignment(CellAlignment::Right),
            Cell::new(row.count).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Prints a chart as a table, or as JSON when `json` is set.
pub fn print_chart(title: &str, chart: &ChartSeries, metric: Metric, json: bool, only_nonzero: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(chart)?);
        return Ok(());
    }
    println!("{}", title.cyan().bold());
    if chart.datasets.is_empty() {
        println!("{}", "No data in this window.".yellow());
        return Ok(());
    }
    println!("{}", chart_table(chart, metric, only_nonzero));
    Ok(())
}

pub fn print_ranking(title: &str, rows: &[DailyRankRow], metric: Metric, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    println!("{}", title.cyan().bold());
    if rows.is_empty() {
        println!("{}", "Nothing to rank for this day.".yellow());
        return Ok(());
    }
    println!("{}", ranking_table(rows, metric));
    Ok(())
}

/// Spinner shown while a store call is in flight. Hidden in JSON mode so stdout stays
/// machine-readable.
pub fn spinner(message: &str, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
