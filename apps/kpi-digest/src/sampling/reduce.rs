use crate::telemetry::{DailyPoint, DailyRow, DailyTable, MetricId, RawRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Max,
    Sum,
}

impl Reducer {
    fn fold(self, acc: Option<f64>, value: f64) -> Option<f64> {
        Some(match (self, acc) {
            (_, None) => value,
            (Self::Max, Some(current)) => current.max(value),
            (Self::Sum, Some(current)) => current + value,
        })
    }

    /// Reduces the non-null values; `None` when every value is missing.
    pub fn reduce<I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        values
            .into_iter()
            .flatten()
            .fold(None, |acc, value| self.fold(acc, value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub metric: MetricId,
    pub reducer: Reducer,
}

impl MetricSpec {
    pub fn new(metric: impl Into<MetricId>, reducer: Reducer) -> Self {
        Self {
            metric: metric.into(),
            reducer,
        }
    }
}

fn group_by_date(records: &[RawRecord]) -> BTreeMap<NaiveDate, Vec<&RawRecord>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&RawRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.date).or_default().push(record);
    }
    grouped
}

/// One row per date present in `records`, one reduced value per spec. No gating.
pub fn reduce_daily(records: &[RawRecord], specs: &[MetricSpec]) -> DailyTable {
    let rows = group_by_date(records)
        .into_iter()
        .map(|(date, group)| DailyRow {
            date,
            values: specs
                .iter()
                .map(|spec| {
                    spec.reducer
                        .reduce(group.iter().map(|record| record.value(&spec.metric)))
                })
                .collect(),
        })
        .collect();

    DailyTable {
        metrics: specs.iter().map(|spec| spec.metric.clone()).collect(),
        rows,
    }
}

/// Like [`reduce_daily`], but keeps a date only when at least one reduced value is `> 0`.
pub fn reduce_daily_gated(records: &[RawRecord], specs: &[MetricSpec]) -> DailyTable {
    let mut table = reduce_daily(records, specs);
    let total = table.rows.len();
    table.rows.retain(|row| {
        row.values
            .iter()
            .any(|value| value.is_some_and(|v| v > 0.0))
    });
    tracing::debug!(
        total_days = total,
        kept_days = table.rows.len(),
        metrics = specs.len(),
        "daily aggregation gated on any positive metric"
    );
    table
}

/// Single-metric reduction used by per-chart pipelines.
pub fn reduce_metric(records: &[RawRecord], metric: &str, reducer: Reducer) -> Vec<DailyPoint> {
    group_by_date(records)
        .into_iter()
        .map(|(date, group)| {
            DailyPoint::new(
                date,
                reducer.reduce(group.iter().map(|record| record.value(metric))),
            )
        })
        .collect()
}
