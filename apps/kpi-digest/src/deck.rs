//! Slide-deck manifest handed to the presentation renderer.

use crate::chart::ChartSeries;
use crate::digest::{AvailabilityReport, Digest};
use crate::error::Result;
use crate::sampling::RangeWindow;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const GRID_COLUMNS: usize = 4;
pub const GRID_ROWS: usize = 3;

pub const FILE_STEM: &str = "KPI_Monitoring_Dashboard";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Slide geometry in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlideLayout {
    pub slide_width: f64,
    pub slide_height: f64,
    pub chart_width: f64,
    pub chart_height: f64,
    pub start_left: f64,
    pub start_top: f64,
    pub h_spacing: f64,
    pub v_spacing: f64,
}

impl Default for SlideLayout {
    fn default() -> Self {
        Self {
            slide_width: 10.0,
            slide_height: 7.5,
            chart_width: 2.3,
            chart_height: 2.0,
            start_left: 0.3,
            start_top: 1.0,
            h_spacing: 2.4,
            v_spacing: 2.1,
        }
    }
}

impl SlideLayout {
    /// `(left, top)` of the chart in grid cell `(row, col)`.
    pub fn origin(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.start_left + col as f64 * self.h_spacing,
            self.start_top + row as f64 * self.v_spacing,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedChart {
    pub row: usize,
    pub col: usize,
    pub left: f64,
    pub top: f64,
    pub chart: ChartSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub title: String,
    pub dashboard: &'static str,
    pub charts: Vec<PlacedChart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<AvailabilityReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckManifest {
    pub generated_at: NaiveDateTime,
    pub window: Option<RangeWindow>,
    pub layout: SlideLayout,
    pub slides: Vec<Slide>,
}

/// `"KPI MONITORING 5G EAST JAVA"` + `" (WEEKLY)"`.
pub fn slide_title(base: &str, suffix: Option<&str>) -> String {
    match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => format!("{base} ({})", suffix.to_uppercase()),
        None => base.to_string(),
    }
}

impl DeckManifest {
    /// Charts past the 3 x 4 grid are dropped with a warning.
    pub fn from_digest(digest: Digest, title_suffix: Option<&str>, generated_at: NaiveDateTime) -> Self {
        let layout = SlideLayout::default();
        let slides = digest
            .dashboards
            .into_iter()
            .map(|dashboard| {
                let total = dashboard.charts.len();
                let charts: Vec<PlacedChart> = dashboard
                    .charts
                    .into_iter()
                    .take(GRID_ROWS * GRID_COLUMNS)
                    .enumerate()
                    .map(|(idx, chart)| {
                        let (row, col) = (idx / GRID_COLUMNS, idx % GRID_COLUMNS);
                        let (left, top) = layout.origin(row, col);
                        PlacedChart {
                            row,
                            col,
                            left,
                            top,
                            chart,
                        }
                    })
                    .collect();
                if charts.len() < total {
                    tracing::warn!(
                        dashboard = dashboard.key,
                        dropped = total - charts.len(),
                        "slide grid is full"
                    );
                }
                Slide {
                    title: slide_title(dashboard.slide_title, title_suffix),
                    dashboard: dashboard.key,
                    charts,
                    availability: dashboard.availability,
                }
            })
            .collect();

        Self {
            generated_at,
            window: digest.window,
            layout,
            slides,
        }
    }

    /// `<dir>/[<prefix>_]KPI_Monitoring_Dashboard_<YYYYMMDD_HHMMSS>.json`
    pub fn default_path(&self, dir: &Path, prefix: Option<&str>) -> PathBuf {
        let stamp = self.generated_at.format(TIMESTAMP_FORMAT);
        let name = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{prefix}_{FILE_STEM}_{stamp}.json"),
            None => format!("{FILE_STEM}_{stamp}.json"),
        };
        dir.join(name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(
            path = %path.display(),
            slides = self.slides.len(),
            "wrote deck manifest"
        );
        Ok(())
    }
}
