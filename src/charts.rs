//! SVG line charts for the daily series.
//!
//! Pure visualization: the two charts plot series the reports module
//! already derived. Rendering writes SVG documents directly; geometry is
//! the only place f64 appears.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::{Itertools, MinMaxResult};
use rust_decimal::prelude::ToPrimitive;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::reports::daily::DailySeries;

const WIDTH: i32 = 720;
const HEIGHT: i32 = 288;
const PADDING: f64 = 36.0;

const VALUE_COLOR: &str = "#348dc1";
const LIQUIDITY_COLOR: &str = "#ffcc00";
const AXIS_COLOR: &str = "#8c8c8c";

/// File names of the rendered charts.
pub const VALUE_CHART_FILE: &str = "portfolio_value.svg";
pub const LIQUIDITY_CHART_FILE: &str = "liquidity.svg";

/// Portfolio value over time.
pub fn portfolio_value_chart(series: &DailySeries) -> String {
    let points: Vec<(NaiveDate, Option<f64>)> = series
        .points
        .iter()
        .map(|p| (p.date, p.total.to_f64()))
        .collect();

    render_line_chart("Portfolio Value", "Value", &points, VALUE_COLOR)
}

/// Cash-to-total liquidity ratio over time. Days where the ratio is
/// undefined break the line instead of plotting a fake zero.
pub fn liquidity_chart(series: &DailySeries) -> String {
    let points: Vec<(NaiveDate, Option<f64>)> = series
        .points
        .iter()
        .map(|p| (p.date, p.liquidity.and_then(|r| r.to_f64())))
        .collect();

    render_line_chart("Portfolio Liquidity", "Liquidity", &points, LIQUIDITY_COLOR)
}

/// Render both charts into a directory and return their paths.
pub fn write_charts(series: &DailySeries, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let value_path = dir.join(VALUE_CHART_FILE);
    let liquidity_path = dir.join(LIQUIDITY_CHART_FILE);

    std::fs::write(&value_path, portfolio_value_chart(series))
        .context("Failed to write portfolio value chart")?;
    std::fs::write(&liquidity_path, liquidity_chart(series))
        .context("Failed to write liquidity chart")?;

    info!(
        "Rendered charts: {}, {}",
        value_path.display(),
        liquidity_path.display()
    );
    Ok((value_path, liquidity_path))
}

fn render_line_chart(
    title: &str,
    y_label: &str,
    points: &[(NaiveDate, Option<f64>)],
    color: &str,
) -> String {
    let mut svg = svg_header(WIDTH, HEIGHT);

    svg.push_str(&format!(
        r#"<text x="{}" y="16" text-anchor="middle" font-size="13">{}</text>"#,
        WIDTH / 2,
        title
    ));

    let values: Vec<f64> = points.iter().filter_map(|(_, v)| *v).collect();

    if !values.is_empty() {
        let (min_v, max_v) = match values.iter().copied().minmax() {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::NoElements => unreachable!("values checked non-empty"),
        };

        for segment in segments(points) {
            let coords: Vec<(f64, f64)> = segment
                .iter()
                .map(|(idx, value)| (x_position(*idx, points.len()), y_position(*value, min_v, max_v)))
                .collect();
            svg.push_str(&polyline(&coords, color));
        }

        add_axes(&mut svg, points, y_label, min_v, max_v);
    }

    svg.push_str("</svg>");
    svg
}

/// Contiguous runs of defined values, as (index, value) pairs.
fn segments(points: &[(NaiveDate, Option<f64>)]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (idx, (_, value)) in points.iter().enumerate() {
        match value {
            Some(v) => current.push((idx, *v)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }

    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

fn x_position(idx: usize, len: usize) -> f64 {
    let plot_width = WIDTH as f64 - 2.0 * PADDING;
    if len <= 1 {
        return PADDING + plot_width / 2.0;
    }
    PADDING + plot_width * idx as f64 / (len - 1) as f64
}

fn y_position(value: f64, min_v: f64, max_v: f64) -> f64 {
    let plot_height = HEIGHT as f64 - 2.0 * PADDING;
    if (max_v - min_v).abs() < f64::EPSILON {
        return PADDING + plot_height / 2.0;
    }
    PADDING + plot_height * (1.0 - (value - min_v) / (max_v - min_v))
}

fn polyline(coords: &[(f64, f64)], stroke: &str) -> String {
    let path = coords
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .join(" ");
    format!(
        r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
        stroke, path
    )
}

fn add_axes(
    svg: &mut String,
    points: &[(NaiveDate, Option<f64>)],
    y_label: &str,
    min_v: f64,
    max_v: f64,
) {
    let bottom = HEIGHT as f64 - PADDING;
    let right = WIDTH as f64 - PADDING;

    svg.push_str(&format!(
        r#"<line x1="{p}" y1="{b}" x2="{r}" y2="{b}" stroke="{c}" stroke-width="0.5"/>"#,
        p = PADDING,
        b = bottom,
        r = right,
        c = AXIS_COLOR
    ));
    svg.push_str(&format!(
        r#"<line x1="{p}" y1="{p}" x2="{p}" y2="{b}" stroke="{c}" stroke-width="0.5"/>"#,
        p = PADDING,
        b = bottom,
        c = AXIS_COLOR
    ));

    if let (Some((first, _)), Some((last, _))) = (points.first(), points.last()) {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="10">{}</text>"#,
            PADDING,
            bottom + 14.0,
            first
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{}</text>"#,
            right,
            bottom + 14.0,
            last
        ));
    }

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="10">Date</text>"#,
        WIDTH / 2,
        bottom + 28.0
    ));

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{:.2}</text>"#,
        PADDING - 4.0,
        bottom,
        min_v
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{:.2}</text>"#,
        PADDING - 4.0,
        PADDING,
        max_v
    ));

    svg.push_str(&format!(
        r#"<text x="12" y="{}" font-size="10" transform="rotate(-90 12 {y})" text-anchor="middle">{}</text>"#,
        HEIGHT / 2,
        y_label,
        y = HEIGHT / 2
    ));
}

fn svg_header(width: i32, height: i32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style>"#,
        w = width,
        h = height
    )
}
