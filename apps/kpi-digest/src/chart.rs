//! Declarative chart hand-off consumed by the renderer.

use crate::telemetry::DailyPoint;
use serde::Serialize;

pub const DATE_LABEL_FORMAT: &str = "%d/%m/%Y";

pub const COLOR_PRIMARY: &str = "#1f77b4";
pub const COLOR_SECONDARY: &str = "#ff7f0e";
pub const COLOR_AREA: &str = "#17516d";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ValueTransform {
    Identity,
    /// `v * 100`
    Percent,
    /// `(1 - v) * 100`, e.g. a success rate from a failure ratio.
    ComplementPercent,
}

impl ValueTransform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Percent => value * 100.0,
            Self::ComplementPercent => (1.0 - value) * 100.0,
        }
    }

    pub fn apply_series(self, series: &[DailyPoint]) -> Vec<DailyPoint> {
        series
            .iter()
            .map(|point| DailyPoint::new(point.date, point.value.map(|v| self.apply(v))))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "style", content = "decimals")]
pub enum TickFormat {
    Plain(u8),
    Percent(u8),
    /// `12,500`
    Grouped,
    /// `50K`
    Kilo,
}

impl TickFormat {
    pub fn label(self, value: f64) -> String {
        match self {
            Self::Plain(decimals) => format!("{value:.prec$}", prec = decimals as usize),
            Self::Percent(decimals) => format!("{value:.prec$}%", prec = decimals as usize),
            Self::Grouped => group_thousands(value.round() as i64),
            Self::Kilo => format!("{}K", (value / 1000.0).trunc() as i64),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisStyle {
    pub range: Option<AxisRange>,
    pub ticks: Option<TickFormat>,
    /// Leave the top tick unlabeled (it only pads the plot).
    pub hide_top_label: bool,
    /// Lower clamp for the smoothed curve.
    pub clip_min: Option<f64>,
}

impl AxisStyle {
    pub const fn auto() -> Self {
        Self {
            range: None,
            ticks: None,
            hide_top_label: false,
            clip_min: None,
        }
    }

    pub const fn fixed(min: f64, max: f64, step: f64, ticks: TickFormat) -> Self {
        Self {
            range: Some(AxisRange { min, max, step }),
            ticks: Some(ticks),
            hide_top_label: true,
            clip_min: None,
        }
    }

    pub fn with_clip_min(mut self, clip_min: f64) -> Self {
        self.clip_min = Some(clip_min);
        self
    }

    /// Tick positions and labels, or `None` for an auto-scaled axis.
    pub fn tick_labels(&self) -> Option<Vec<(f64, String)>> {
        let range = self.range?;
        let format = self.ticks.unwrap_or(TickFormat::Plain(2));
        if range.step <= 0.0 || range.max < range.min {
            return None;
        }
        let count = ((range.max - range.min) / range.step + 1e-9).floor() as usize;
        Some(
            (0..=count)
                .map(|i| {
                    let value = range.min + range.step * i as f64;
                    let is_top = (value - range.max).abs() < range.step * 0.05;
                    let label = if self.hide_top_label && is_top {
                        String::new()
                    } else {
                        format.label(value)
                    };
                    (value, label)
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChartKind {
    Line,
    Area,
    Bar,
    /// Two smoothed lines; the follower is drawn only where it has data.
    DualLine {
        primary_label: &'static str,
        follower_label: &'static str,
    },
    /// Line on the left axis, translucent bars on the right axis.
    LineBar {
        primary_label: &'static str,
        follower_label: &'static str,
        follower_axis: AxisStyle,
    },
    Stacked {
        first_label: &'static str,
        second_label: &'static str,
    },
    /// Stacked percentage shares of the two metrics.
    StackedShare {
        first_label: &'static str,
        second_label: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    /// Position on the evenly spaced x-axis.
    pub x: usize,
    pub date: chrono::NaiveDate,
    pub label: String,
    pub value: Option<f64>,
}

pub fn plot_points(series: &[DailyPoint]) -> Vec<PlotPoint> {
    series
        .iter()
        .enumerate()
        .map(|(x, point)| PlotPoint {
            x,
            date: point.date,
            label: point.date.format(DATE_LABEL_FORMAT).to_string(),
            value: point.value,
        })
        .collect()
}

/// One chart, ready for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: &'static str,
    pub title: &'static str,
    pub y_label: &'static str,
    pub color: &'static str,
    pub kind: ChartKind,
    pub axis: AxisStyle,
    pub primary: Vec<PlotPoint>,
    /// Follower or stacked partner. `x` refers to the primary axis.
    pub secondary: Vec<PlotPoint>,
    pub y_ticks: Option<Vec<(f64, String)>>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.primary.len()
    }
}
