use super::policy::ValidityPolicy;
use crate::telemetry::DailyPoint;
use chrono::NaiveDate;
use serde::Serialize;

/// A jump whose calendar gap exceeds `stride * GAP_TOLERANCE` days is treated as crossing
/// missing days. The comparison is strict.
pub const GAP_TOLERANCE: f64 = 1.5;

/// Nominal day spacing between displayed points. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stride(usize);

impl Stride {
    pub fn new(days: usize) -> Self {
        Self(days.max(1))
    }

    pub fn days(self) -> usize {
        self.0
    }

    fn tolerance_days(self) -> f64 {
        self.0 as f64 * GAP_TOLERANCE
    }
}

impl Default for Stride {
    fn default() -> Self {
        Self(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Every valid day is displayed.
    EveryDay,
    /// Index stride from the newest point, blind to calendar gaps.
    FixedStride,
    /// Index stride from the newest point with one extra stride per detected calendar gap.
    GapAware,
}

impl SelectionMode {
    /// Metrics that treat zero as "no data" get gap compensation; for metrics where zero is a
    /// reading a hole is rarer and the plain stride is used.
    pub fn default_for(policy: ValidityPolicy) -> Self {
        match policy {
            ValidityPolicy::PositiveOnly => Self::GapAware,
            ValidityPolicy::NonNegative | ValidityPolicy::NotNullOnly => Self::FixedStride,
        }
    }

    /// `series` must be sorted by date with unique dates, already clipped and filtered.
    pub fn select(self, series: &[DailyPoint], stride: Stride) -> Vec<DailyPoint> {
        let indices = match self {
            Self::EveryDay => return series.to_vec(),
            Self::FixedStride => fixed_stride_indices(series.len(), stride),
            Self::GapAware => {
                let dates: Vec<NaiveDate> = series.iter().map(|point| point.date).collect();
                gap_aware_indices(&dates, stride)
            }
        };
        tracing::trace!(
            mode = ?self,
            stride = stride.days(),
            valid = series.len(),
            selected = indices.len(),
            "stride selection"
        );
        indices.into_iter().map(|idx| series[idx]).collect()
    }
}

/// `n-1, n-1-S, n-1-2S, ...` down to the first index `>= 0`, returned oldest first.
pub fn fixed_stride_indices(n: usize, stride: Stride) -> Vec<usize> {
    let Some(last) = n.checked_sub(1) else {
        return Vec::new();
    };
    let mut indices: Vec<usize> = (0..=last).rev().step_by(stride.days()).collect();
    indices.reverse();
    indices
}

/// Walks back from the newest date by `S` indices at a time. When the candidate is more than
/// `S * 1.5` calendar days older than the current point, the walk skips one extra stride.
/// Returned oldest first.
pub fn gap_aware_indices(dates: &[NaiveDate], stride: Stride) -> Vec<usize> {
    let mut selected = Vec::new();
    let Some(mut current) = dates.len().checked_sub(1) else {
        return selected;
    };

    loop {
        selected.push(current);
        let Some(candidate) = current.checked_sub(stride.days()) else {
            break;
        };
        match compensate_gap(dates, current, candidate, stride) {
            Some(next) => current = next,
            None => break,
        }
    }

    selected.reverse();
    selected
}

/// Next index to visit after `current`, given the plain `candidate = current - S`.
///
/// The extra stride taken across a gap is not re-checked, and when it runs past index 0 the
/// walk ends: valid points between index 0 and the overshoot are not displayed. Callers rely on
/// this exact behavior; a corrected walk belongs in a separate function.
fn compensate_gap(
    dates: &[NaiveDate],
    current: usize,
    candidate: usize,
    stride: Stride,
) -> Option<usize> {
    let gap_days = (dates[current] - dates[candidate]).num_days();
    if gap_days as f64 > stride.tolerance_days() {
        return candidate.checked_sub(stride.days());
    }
    Some(candidate)
}
