use super::policy::ValidityPolicy;
use crate::telemetry::DailyPoint;
use chrono::NaiveDate;
use serde::Serialize;

/// A follower value is drawn only when it is present and strictly positive.
pub const FOLLOWER_POLICY: ValidityPolicy = ValidityPolicy::PositiveOnly;

/// Two curves on one x-axis. `primary` owns the axis; `follower` holds only the primary dates
/// where the follower had a drawable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DualSeries {
    pub primary: Vec<DailyPoint>,
    pub follower: Vec<DailyPoint>,
}

impl DualSeries {
    /// Axis positions (indices into `primary`) of each follower point.
    pub fn follower_positions(&self) -> Vec<usize> {
        self.follower
            .iter()
            .filter_map(|point| position_of(&self.primary, point.date))
            .collect()
    }
}

fn position_of(series: &[DailyPoint], date: NaiveDate) -> Option<usize> {
    series.binary_search_by_key(&date, |point| point.date).ok()
}

/// Value of `other` at each date of `primary`, `None` where `other` has no row.
pub fn lookup_at(primary: &[DailyPoint], other: &[DailyPoint]) -> Vec<DailyPoint> {
    primary
        .iter()
        .map(|point| {
            let value = position_of(other, point.date).and_then(|idx| other[idx].value);
            DailyPoint::new(point.date, value)
        })
        .collect()
}

/// Evaluates `follower` at the dates already selected for `primary`.
///
/// `follower` is the follower's full daily series; it is never strided on its own.
pub fn align_follower(primary: &[DailyPoint], follower: &[DailyPoint]) -> DualSeries {
    let follower = FOLLOWER_POLICY.filter(&lookup_at(primary, follower));
    DualSeries {
        primary: primary.to_vec(),
        follower,
    }
}
