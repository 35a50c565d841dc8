use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Column name of a KPI in the source table (e.g. `avail_auto_5g`).
pub type MetricId = String;

/// One source row: a calendar date, the monitored entity it belongs to and its KPI columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub entity: Option<String>,
    pub metric_values: HashMap<MetricId, Option<f64>>,
}

impl RawRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            entity: None,
            metric_values: HashMap::new(),
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_value(mut self, metric: impl Into<MetricId>, value: Option<f64>) -> Self {
        self.metric_values.insert(metric.into(), value);
        self
    }

    /// Value of `metric` on this row. NaN/inf are treated as missing.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metric_values
            .get(metric)
            .copied()
            .flatten()
            .filter(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl DailyPoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Reduced daily values for several metrics at once. `values[i]` of every row belongs to
/// `metrics[i]`; rows are strictly increasing by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyTable {
    pub metrics: Vec<MetricId>,
    pub rows: Vec<DailyRow>,
}

impl DailyTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    /// Projects one metric out of the table. Unknown metrics yield an empty series.
    pub fn series(&self, metric: &str) -> Vec<DailyPoint> {
        let Some(column) = self.metrics.iter().position(|m| m == metric) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| DailyPoint::new(row.date, row.values.get(column).copied().flatten()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn non_finite_values_read_as_missing() {
        let record = RawRecord::new(day(1))
            .with_value("a", Some(f64::NAN))
            .with_value("b", Some(2.0))
            .with_value("c", None);
        assert_eq!(record.value("a"), None);
        assert_eq!(record.value("b"), Some(2.0));
        assert_eq!(record.value("c"), None);
        assert_eq!(record.value("missing"), None);
    }

    #[test]
    fn table_series_projects_by_metric_name() {
        let table = DailyTable {
            metrics: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                DailyRow {
                    date: day(1),
                    values: vec![Some(1.0), None],
                },
                DailyRow {
                    date: day(2),
                    values: vec![Some(3.0), Some(4.0)],
                },
            ],
        };
        assert_eq!(
            table.series("b"),
            vec![DailyPoint::new(day(1), None), DailyPoint::new(day(2), Some(4.0))]
        );
        assert!(table.series("zzz").is_empty());
        assert_eq!(table.dates(), vec![day(1), day(2)]);
    }
}
