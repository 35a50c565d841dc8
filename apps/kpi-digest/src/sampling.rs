//! Daily sampling engine.
//!
//! Turns raw per-entity KPI rows into the points a chart actually shows:
//!
//! 1. [`reduce`] collapses every (date, metric) group into one value (max or sum).
//! 2. [`window`] clips the daily series to the trailing window anchored at the dataset's
//!    latest date.
//! 3. [`policy`] drops days whose value is not displayable for that metric.
//! 4. [`stride`] picks the displayed subset at a fixed cadence, optionally compensating for
//!    missing days.
//! 5. [`align`] evaluates a follower metric on the dates chosen for a primary metric.
//! 6. [`interpolate`] fills weak values of an already-selected series for visual continuity.
//!
//! Every stage takes a slice and returns a fresh `Vec`; nothing here fails or mutates its input.

pub mod align;
pub mod interpolate;
pub mod policy;
pub mod reduce;
pub mod stride;
pub mod window;

pub use align::{align_follower, lookup_at, DualSeries, FOLLOWER_POLICY};
pub use interpolate::interpolate_display;
pub use policy::{apply_floor, ValidityPolicy};
pub use reduce::{reduce_daily, reduce_daily_gated, reduce_metric, MetricSpec, Reducer};
pub use stride::{SelectionMode, Stride, GAP_TOLERANCE};
pub use window::{dataset_max_date, RangeWindow};

use crate::telemetry::DailyPoint;

/// Clip, filter, floor and select one already-reduced metric series.
pub fn sample_series(
    daily: &[DailyPoint],
    window: &RangeWindow,
    policy: ValidityPolicy,
    floor: Option<f64>,
    mode: SelectionMode,
    stride: Stride,
) -> Vec<DailyPoint> {
    let clipped = window.clip(daily);
    let mut valid = policy.filter(&clipped);
    if let Some(floor) = floor {
        valid = apply_floor(&valid, floor);
    }
    mode.select(&valid, stride)
}
