use crate::telemetry::DailyPoint;
use serde::Serialize;

/// Which daily values count as displayable for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityPolicy {
    /// Non-null and `> 0`. Zero means "no data" (availability, success ratios).
    PositiveOnly,
    /// Non-null and `>= 0`. Zero is a real reading (a drop rate of 0).
    NonNegative,
    /// Non-null. Zero and negative are real readings (traffic, user counts).
    NotNullOnly,
}

impl ValidityPolicy {
    pub fn accepts(self, value: Option<f64>) -> bool {
        match (self, value) {
            (_, None) => false,
            (Self::PositiveOnly, Some(v)) => v > 0.0,
            (Self::NonNegative, Some(v)) => v >= 0.0,
            (Self::NotNullOnly, Some(_)) => true,
        }
    }

    pub fn filter(self, series: &[DailyPoint]) -> Vec<DailyPoint> {
        series
            .iter()
            .filter(|point| self.accepts(point.value))
            .copied()
            .collect()
    }
}

/// Chart-level refinement applied after the policy: keep only `value >= floor`.
pub fn apply_floor(series: &[DailyPoint], floor: f64) -> Vec<DailyPoint> {
    series
        .iter()
        .filter(|point| point.value.is_some_and(|v| v >= floor))
        .copied()
        .collect()
}
