use ratatui::{
    prelude::*,
    symbols,
    widgets::{
        block::{Position, Title},
        canvas::{Canvas, Points},
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
    },
};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::metrics::{AggregatedSeries, MetricKind};

pub const HISTOGRAM_BINS: usize = 10;

/// Height given to the tallest bar; the others are scaled against it.
const BAR_TICKS: f64 = 10_000.0;

/// Angle, in degrees, at which the first pie slice starts.
const PIE_START_ANGLE: f64 = 140.0;

const PIE_PALETTE: [Color; 12] = [
    Color::Rgb(166, 206, 227),
    Color::Rgb(31, 120, 180),
    Color::Rgb(178, 223, 138),
    Color::Rgb(51, 160, 44),
    Color::Rgb(251, 154, 153),
    Color::Rgb(227, 26, 28),
    Color::Rgb(253, 191, 111),
    Color::Rgb(255, 127, 0),
    Color::Rgb(202, 178, 214),
    Color::Rgb(106, 61, 154),
    Color::Rgb(255, 255, 153),
    Color::Rgb(177, 89, 40),
];

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("Invalid chart type '{0}'. Please enter 'bar', 'pie', 'line', or 'hist'.")]
    UnknownChartKind(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to plot")]
    EmptySeries,

    #[error("{label} has a non-finite value")]
    NonFinite { label: String },

    #[error("wedge sizes must be non-negative, {label} is {value}")]
    NegativeWedge { label: String, value: f64 },

    #[error("wedge sizes sum to zero")]
    ZeroTotal,

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Hist,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Line,
        ChartKind::Hist,
    ];
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Hist => "hist",
        };
        f.write_str(name)
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let wanted = trimmed.to_lowercase();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == wanted)
            .ok_or_else(|| ChartError::UnknownChartKind(trimmed.to_owned()))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub share: f64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub enum PlotBody {
    Bars(Vec<(String, f64)>),
    Line(Vec<(String, f64)>),
    Pie(Vec<Slice>),
    Histogram(Vec<Bin>),
}

/// Everything needed to draw one chart, validated up front.
#[derive(Debug, PartialEq, Clone)]
pub struct Plot {
    pub kind: ChartKind,
    pub metric: MetricKind,
    pub title: String,
    pub color: Color,
    pub body: PlotBody,
}

impl Plot {
    pub fn new(kind: ChartKind, series: &AggregatedSeries) -> Result<Self, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptySeries);
        }
        if let Some((label, _)) = series.points.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RenderError::NonFinite {
                label: label.clone(),
            });
        }

        let metric = series.metric;
        let title = match kind {
            ChartKind::Bar => format!("{} by Product (Bar Chart)", metric.label()),
            ChartKind::Pie => format!("{} by Product (Pie Chart)", metric.label()),
            ChartKind::Line => format!("{} by Product (Line Chart)", metric.label()),
            ChartKind::Hist => format!("{} Distribution (Histogram)", metric.label()),
        };
        let body = match kind {
            ChartKind::Bar => PlotBody::Bars(series.points.clone()),
            ChartKind::Line => PlotBody::Line(series.points.clone()),
            ChartKind::Pie => PlotBody::Pie(pie_slices(series)?),
            ChartKind::Hist => PlotBody::Histogram(histogram(series.values(), HISTOGRAM_BINS)),
        };

        Ok(Plot {
            kind,
            metric,
            title,
            color: metric_color(metric),
            body,
        })
    }
}

pub fn metric_color(metric: MetricKind) -> Color {
    match metric {
        MetricKind::Profit => Color::Green,
        MetricKind::Revenue => Color::Blue,
        MetricKind::Loss => Color::Red,
        MetricKind::Sales => Color::Rgb(255, 165, 0),
    }
}

fn pie_slices(series: &AggregatedSeries) -> Result<Vec<Slice>, RenderError> {
    if let Some((label, value)) = series.points.iter().find(|(_, v)| *v < 0.0) {
        return Err(RenderError::NegativeWedge {
            label: label.clone(),
            value: *value,
        });
    }

    let total: f64 = series.values().sum();
    if total == 0.0 {
        return Err(RenderError::ZeroTotal);
    }

    Ok(series
        .points
        .iter()
        .map(|(label, value)| Slice {
            label: label.clone(),
            value: *value,
            share: value / total,
        })
        .collect())
}

/// Equal-width bins from the smallest to the largest value; the last bin is closed.
pub fn histogram(values: impl Iterator<Item = f64>, bins: usize) -> Vec<Bin> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0u64; bins];
    for value in values {
        let idx = (((value - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| Bin {
            start: lo + width * idx as f64,
            end: lo + width * (idx + 1) as f64,
            count,
        })
        .collect()
}

/// Index of the slice covering the direction `angle` (degrees, counter-clockwise from +x).
pub fn slice_at(angle: f64, slices: &[Slice]) -> Option<usize> {
    let fraction = (angle - PIE_START_ANGLE).rem_euclid(360.0) / 360.0;
    let mut cumulative = 0.0;
    for (idx, slice) in slices.iter().enumerate() {
        cumulative += slice.share;
        if fraction < cumulative {
            return Some(idx);
        }
    }
    slices.len().checked_sub(1)
}

fn format_value(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.2}", value)
    }
}

fn value_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo == hi {
        [lo, lo + 1.0]
    } else {
        let pad = hi * 0.05 - lo * 0.05;
        [if lo < 0.0 { lo - pad } else { lo }, hi + pad]
    }
}

/// Draws `plot` into `area` with a key hint underneath.
pub fn draw(frame: &mut Frame, area: Rect, plot: &Plot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let block = Block::default()
        .title(format!(" {} ", plot.title))
        .borders(Borders::ALL);

    match &plot.body {
        PlotBody::Bars(points) => draw_bars(frame, chunks[0], block, plot, points),
        PlotBody::Line(points) => draw_line(frame, chunks[0], block, plot, points),
        PlotBody::Pie(slices) => draw_pie(frame, chunks[0], block, slices),
        PlotBody::Histogram(bins) => draw_histogram(frame, chunks[0], block, plot, bins),
    }

    let hint = Paragraph::new(Line::from(vec![
        Span::styled(plot.metric.label(), Style::default().fg(plot.color)),
        Span::raw(format!(" | {} rows | press any key to continue", row_count(plot))),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(hint, chunks[1]);
}

fn row_count(plot: &Plot) -> usize {
    match &plot.body {
        PlotBody::Bars(points) | PlotBody::Line(points) => points.len(),
        PlotBody::Pie(slices) => slices.len(),
        PlotBody::Histogram(bins) => bins.iter().map(|b| b.count as usize).sum(),
    }
}

fn bar_width(area: Rect, bars: usize) -> u16 {
    let inner = area.width.saturating_sub(2) as usize;
    let per_bar = inner / bars.max(1);
    per_bar.saturating_sub(1).clamp(1, 12) as u16
}

/// Unsigned bar heights relative to the largest magnitude, at most [`BAR_TICKS`].
pub fn bar_heights(values: impl Iterator<Item = f64>) -> Vec<u64> {
    let values: Vec<f64> = values.collect();
    let largest = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if largest == 0.0 {
        return vec![0; values.len()];
    }

    values
        .iter()
        .map(|v| (v.abs() / largest * BAR_TICKS).round() as u64)
        .collect()
}

fn draw_bars(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    plot: &Plot,
    points: &[(String, f64)],
) {
    // The sign is carried by the style and the printed value.
    let heights = bar_heights(points.iter().map(|(_, v)| *v));
    let bars: Vec<Bar> = points
        .iter()
        .zip(heights)
        .map(|((label, value), height)| {
            let style = if *value < 0.0 {
                Style::default().fg(plot.color).add_modifier(Modifier::DIM)
            } else {
                Style::default().fg(plot.color)
            };
            Bar::default()
                .value(height)
                .text_value(format_value(*value))
                .label(Line::from(label.clone()))
                .style(style)
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .bar_width(bar_width(area, bars.len()))
        .bar_gap(1)
        .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .label_style(Style::default().fg(Color::Yellow))
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

fn draw_histogram(frame: &mut Frame, area: Rect, block: Block, plot: &Plot, bins: &[Bin]) {
    let bars: Vec<Bar> = bins
        .iter()
        .map(|bin| {
            Bar::default()
                .value(bin.count)
                .label(Line::from(format_value((bin.start + bin.end) / 2.0)))
                .style(Style::default().fg(plot.color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            block.title(
                Title::from(format!(" {} / Frequency ", plot.metric.label()))
                    .position(Position::Bottom),
            ),
        )
        .bar_width(bar_width(area, bars.len()))
        .bar_gap(1)
        .value_style(Style::default().fg(Color::Black).bg(plot.color))
        .label_style(Style::default().fg(Color::Yellow))
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

fn draw_line(frame: &mut Frame, area: Rect, block: Block, plot: &Plot, points: &[(String, f64)]) {
    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(idx, (_, value))| (idx as f64, *value))
        .collect();

    let y_bounds = value_bounds(points.iter().map(|(_, v)| *v));
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let datasets = vec![
        Dataset::default()
            .name(plot.metric.label())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(plot.color))
            .data(&data),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(plot.color).add_modifier(Modifier::BOLD))
            .data(&data),
    ];

    let x_labels: Vec<Span> = points.iter().map(|(label, _)| Span::raw(label.clone())).collect();
    let y_labels: Vec<Span> = vec![
        Span::raw(format_value(y_bounds[0])),
        Span::raw(format_value((y_bounds[0] + y_bounds[1]) / 2.0)),
        Span::raw(format_value(y_bounds[1])),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Product Name")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(plot.metric.label())
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

fn draw_pie(frame: &mut Frame, area: Rect, block: Block, slices: &[Slice]) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    const STEPS: usize = 160;
    let mut wedges: Vec<Vec<(f64, f64)>> = vec![Vec::new(); slices.len()];
    for i in 0..=STEPS {
        for j in 0..=STEPS {
            let x = -1.0 + 2.0 * i as f64 / STEPS as f64;
            let y = -1.0 + 2.0 * j as f64 / STEPS as f64;
            if x * x + y * y > 1.0 {
                continue;
            }
            if let Some(idx) = slice_at(y.atan2(x).to_degrees(), slices) {
                wedges[idx].push((x, y));
            }
        }
    }

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            for (idx, coords) in wedges.iter().enumerate() {
                ctx.draw(&Points {
                    coords,
                    color: PIE_PALETTE[idx % PIE_PALETTE.len()],
                });
            }
        });
    frame.render_widget(canvas, chunks[0]);

    let legend: Vec<Line> = slices
        .iter()
        .enumerate()
        .map(|(idx, slice)| {
            Line::from(vec![
                Span::styled("■ ", Style::default().fg(PIE_PALETTE[idx % PIE_PALETTE.len()])),
                Span::raw(format!(
                    "{} {:.1}% ({})",
                    slice.label,
                    slice.share * 100.0,
                    format_value(slice.value)
                )),
            ])
        })
        .collect();
    let legend = Paragraph::new(legend)
        .block(Block::default().title(" Legend ").borders(Borders::ALL));
    frame.render_widget(legend, chunks[1]);
}
