use crate::telemetry::{DailyPoint, RawRecord};
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Latest date present anywhere in the imported dataset.
pub fn dataset_max_date(records: &[RawRecord]) -> Option<NaiveDate> {
    records.iter().map(|record| record.date).max()
}

/// Inclusive trailing window `[end - days_back, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RangeWindow {
    pub fn trailing(end: NaiveDate, days_back: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Window anchored on the dataset's global max date; `None` for an empty dataset.
    pub fn from_records(records: &[RawRecord], days_back: u32) -> Option<Self> {
        dataset_max_date(records).map(|end| Self::trailing(end, days_back))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |date| *date <= end)
    }

    pub fn clip(&self, series: &[DailyPoint]) -> Vec<DailyPoint> {
        series
            .iter()
            .filter(|point| self.contains(point.date))
            .copied()
            .collect()
    }

    pub fn clip_records(&self, records: &[RawRecord]) -> Vec<RawRecord> {
        records
            .iter()
            .filter(|record| self.contains(record.date))
            .cloned()
            .collect()
    }
}
