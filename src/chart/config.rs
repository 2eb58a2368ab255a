//! Chart definitions handed to the charting library.
//!
//! The shapes serialize to Chart.js configuration objects; only the series
//! and axis setup is modelled, drawing is left to the backend.

use crate::model::{OhlcvFrame, Rgba, SeriesDescriptor, SeriesKind, Timeframe, TimeSeries};
use crate::resolver::palette;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

const PRIMARY_AXIS: &str = "y";
const SECONDARY_AXIS: &str = "y1";
const TOOLTIP_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
}

/// Tick granularity of the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Total: anything unrecognised is shown in minutes.
    pub fn for_timeframe(tf: &Timeframe) -> Self {
        match tf {
            Timeframe::Min1 => TimeUnit::Minute,
            Timeframe::Hour1 => TimeUnit::Hour,
            Timeframe::Day1 => TimeUnit::Day,
            Timeframe::Other(_) => TimeUnit::Minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub x: DateTime<Utc>,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub dataset_type: Option<ChartType>,
    pub data: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_dash: Option<[u32; 2]>,
    pub fill: bool,
    pub tension: f64,
    pub point_radius: f64,
    pub hidden: bool,
    #[serde(rename = "yAxisID")]
    pub y_axis_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub display: bool,
    pub text: String,
}

impl AxisTitle {
    fn new(text: &str) -> Self {
        Self { display: true, text: text.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOptions {
    pub unit: TimeUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip_format: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub display_formats: BTreeMap<TimeUnit, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeAxis {
    #[serde(rename = "type")]
    pub axis_type: &'static str,
    pub time: TimeOptions,
    pub title: AxisTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPosition {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptions {
    pub draw_on_chart_area: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearAxis {
    #[serde(rename = "type")]
    pub axis_type: &'static str,
    pub position: AxisPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<AxisTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin_at_zero: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scales {
    pub x: TimeAxis,
    pub y: LinearAxis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y1: Option<LinearAxis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HoverMode {
    Index,
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendOptions {
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipOptions {
    pub mode: HoverMode,
    pub intersect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginOptions {
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
}

/// Hover behaviour: snap to the nearest x position, not to a hit point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionOptions {
    pub mode: HoverMode,
    pub axis: &'static str,
    pub intersect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub scales: Scales,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<InteractionOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: ChartData,
    pub options: ChartOptions,
}

impl ChartConfig {
    pub fn dataset(&self, label: &str) -> Option<&Dataset> {
        self.data.datasets.iter().find(|d| d.label == label)
    }
}

fn points(series: &TimeSeries) -> Vec<Point> {
    series.points.iter().map(|&(x, y)| Point { x, y }).collect()
}

/// One of the OHLC columns drawn on the price axis.
pub fn price_line(label: &str, series: TimeSeries, color: Rgba) -> SeriesDescriptor {
    SeriesDescriptor {
        label: label.to_string(),
        kind: SeriesKind::PriceLine,
        color,
        dashed: false,
        data: series,
        secondary_axis: None,
    }
}

fn dataset(desc: &SeriesDescriptor, hidden: bool) -> Dataset {
    // base lines inherit the chart type, overlays name theirs
    let (dataset_type, width, axis) = match desc.kind {
        SeriesKind::PriceLine => (None, 3, PRIMARY_AXIS),
        SeriesKind::Overlay => (Some(ChartType::Line), 2, PRIMARY_AXIS),
        SeriesKind::BoundedIndicator => (Some(ChartType::Line), 2, SECONDARY_AXIS),
    };
    Dataset {
        label: desc.label.clone(),
        dataset_type,
        data: points(&desc.data),
        border_color: Some(desc.color),
        background_color: None,
        border_width: Some(width),
        border_dash: desc.dashed.then_some([5, 5]),
        fill: false,
        tension: 0.0,
        point_radius: 0.0,
        hidden,
        y_axis_id: axis.to_string(),
    }
}

fn time_axis(unit: TimeUnit, detailed: bool) -> TimeAxis {
    let (tooltip_format, display_formats) = if detailed {
        let formats = BTreeMap::from([
            (TimeUnit::Minute, "HH:mm".to_string()),
            (TimeUnit::Hour, "HH:mm".to_string()),
            (TimeUnit::Day, "MMM dd".to_string()),
        ]);
        (Some(TOOLTIP_FORMAT.to_string()), formats)
    } else {
        (None, BTreeMap::new())
    };
    TimeAxis {
        axis_type: "time",
        time: TimeOptions { unit, tooltip_format, display_formats },
        title: AxisTitle::new("Time"),
    }
}

fn value_axis(title: &str, begin_at_zero: Option<bool>) -> LinearAxis {
    LinearAxis {
        axis_type: "linear",
        position: AxisPosition::Left,
        title: Some(AxisTitle::new(title)),
        begin_at_zero,
        min: None,
        max: None,
        grid: None,
    }
}

/// Close, then hidden Open/High/Low, then overlays in resolver order. A
/// bounded overlay adds a fixed secondary axis on the right.
pub fn price_chart(
    base: &OhlcvFrame,
    overlays: &[SeriesDescriptor],
    timeframe: &Timeframe,
) -> ChartConfig {
    let base_lines = [
        (price_line("Close", base.close_series(), palette::CLOSE), false),
        (price_line("Open", base.open_series(), palette::OPEN), true),
        (price_line("High", base.high_series(), palette::HIGH), true),
        (price_line("Low", base.low_series(), palette::LOW), true),
    ];
    let mut datasets: Vec<Dataset> =
        base_lines.iter().map(|(desc, hidden)| dataset(desc, *hidden)).collect();
    datasets.extend(overlays.iter().map(|o| dataset(o, false)));

    let y1 = overlays
        .iter()
        .find_map(|o| o.secondary_axis)
        .map(|range| LinearAxis {
            axis_type: "linear",
            position: AxisPosition::Right,
            title: None,
            begin_at_zero: None,
            min: Some(range.min),
            max: Some(range.max),
            grid: Some(GridOptions { draw_on_chart_area: false }),
        });

    ChartConfig {
        chart_type: ChartType::Line,
        data: ChartData { datasets },
        options: ChartOptions {
            responsive: true,
            maintain_aspect_ratio: false,
            scales: Scales {
                x: time_axis(TimeUnit::for_timeframe(timeframe), true),
                y: value_axis("Price", Some(false)),
                y1,
            },
            plugins: Some(PluginOptions {
                legend: LegendOptions { display: true },
                tooltip: TooltipOptions { mode: HoverMode::Index, intersect: false },
            }),
            interaction: Some(InteractionOptions {
                mode: HoverMode::Nearest,
                axis: "x",
                intersect: false,
            }),
        },
    }
}

/// Single bar series sharing the price chart's time unit.
pub fn volume_chart(volume: &TimeSeries, timeframe: &Timeframe) -> ChartConfig {
    let dataset = Dataset {
        label: "Volume".to_string(),
        dataset_type: None,
        data: points(volume),
        border_color: None,
        background_color: Some(palette::VOLUME),
        border_width: None,
        border_dash: None,
        fill: false,
        tension: 0.0,
        point_radius: 0.0,
        hidden: false,
        y_axis_id: PRIMARY_AXIS.to_string(),
    };
    ChartConfig {
        chart_type: ChartType::Bar,
        data: ChartData { datasets: vec![dataset] },
        options: ChartOptions {
            responsive: true,
            maintain_aspect_ratio: false,
            scales: Scales {
                x: time_axis(TimeUnit::for_timeframe(timeframe), false),
                y: value_axis("Volume", None),
                y1: None,
            },
            plugins: None,
            interaction: None,
        },
    }
}
