//! Runs the sampling pipeline for every catalog chart.

use crate::catalog::{ChartSpec, DashboardSpec, SeriesSource};
use crate::chart::{plot_points, ChartKind, ChartSeries, PlotPoint};
use crate::sampling::{
    align_follower, interpolate_display, lookup_at, reduce_daily_gated, reduce_metric,
    sample_series, RangeWindow, Reducer, Stride,
};
use crate::telemetry::{DailyPoint, DailyTable, RawRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOptions {
    pub days_back: u32,
    pub stride: Stride,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            days_back: 35,
            stride: Stride::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardDigest {
    pub key: &'static str,
    pub slide_title: &'static str,
    /// Dates kept by the shared table's "any metric positive" gate.
    pub table_days: usize,
    pub charts: Vec<ChartSeries>,
    pub availability: Option<AvailabilityReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    /// `None` when the dataset had no rows.
    pub window: Option<RangeWindow>,
    pub dashboards: Vec<DashboardDigest>,
}

pub fn build_digest(
    records: &[RawRecord],
    dashboards: &[DashboardSpec],
    options: &DigestOptions,
) -> Digest {
    let window = RangeWindow::from_records(records, options.days_back);
    match &window {
        Some(window) => tracing::info!(
            start = %window.start,
            end = %window.end,
            records = records.len(),
            "range window"
        ),
        None => tracing::warn!("dataset is empty; every chart will be empty"),
    }

    let dashboards = dashboards
        .iter()
        .map(|spec| build_dashboard(records, window.as_ref(), spec, options.stride))
        .collect();
    Digest { window, dashboards }
}

pub fn build_dashboard(
    records: &[RawRecord],
    window: Option<&RangeWindow>,
    spec: &DashboardSpec,
    stride: Stride,
) -> DashboardDigest {
    let Some(window) = window else {
        return DashboardDigest {
            key: spec.key,
            slide_title: spec.slide_title,
            table_days: 0,
            charts: spec.charts.iter().map(|chart| render(chart, &[], &[])).collect(),
            availability: None,
        };
    };

    let table = reduce_daily_gated(&window.clip_records(records), &spec.table_metrics);
    let charts: Vec<ChartSeries> = spec
        .charts
        .iter()
        .map(|chart| build_chart(records, &table, window, chart, stride))
        .collect();

    let availability = spec
        .chart("availability")
        .map(|chart| availability_report(records, chart.metric, window));
    if let Some(report) = &availability {
        tracing::info!(
            dashboard = spec.key,
            metric = %report.metric,
            first_valid = ?report.first_valid,
            last_valid = ?report.last_valid,
            missing_days = report.missing_dates.len(),
            "availability coverage"
        );
    }

    DashboardDigest {
        key: spec.key,
        slide_title: spec.slide_title,
        table_days: table.len(),
        charts,
        availability,
    }
}

fn daily_series(
    records: &[RawRecord],
    table: &DailyTable,
    source: SeriesSource,
    metric: &str,
    reducer: Reducer,
) -> Vec<DailyPoint> {
    match source {
        SeriesSource::PerMetric => reduce_metric(records, metric, reducer),
        SeriesSource::SharedTable => table.series(metric),
    }
}

/// reduce → clip → validity → floor → select → align → interpolate → transform.
pub fn build_chart(
    records: &[RawRecord],
    table: &DailyTable,
    window: &RangeWindow,
    chart: &ChartSpec,
    stride: Stride,
) -> ChartSeries {
    let daily = daily_series(records, table, chart.source, chart.metric, chart.reducer);
    let mut primary = sample_series(
        &daily,
        window,
        chart.policy,
        chart.floor,
        chart.selection,
        stride,
    );

    let companion = chart.companion.map(|companion| {
        let daily = daily_series(
            records,
            table,
            chart.source,
            companion.metric,
            companion.reducer,
        );
        window.clip(&daily)
    });

    let mut secondary = Vec::new();
    match (&chart.kind, companion) {
        (ChartKind::DualLine { .. } | ChartKind::LineBar { .. }, Some(follower)) => {
            secondary = align_follower(&primary, &follower).follower;
        }
        (ChartKind::Stacked { .. }, Some(partner)) => {
            secondary = lookup_at(&primary, &partner);
        }
        (ChartKind::StackedShare { .. }, Some(partner)) => {
            (primary, secondary) = share_series(&primary, &partner);
        }
        _ => {}
    }

    if let Some(threshold) = chart.interpolate_threshold {
        primary = interpolate_display(&primary, threshold);
    }
    let primary = chart.transform.apply_series(&primary);

    let series = render(chart, &primary, &secondary);
    if series.is_empty() {
        tracing::warn!(chart = chart.name, metric = chart.metric, "no displayable points");
    } else {
        tracing::debug!(
            chart = chart.name,
            metric = chart.metric,
            daily = daily.len(),
            points = series.point_count(),
            secondary = series.secondary.len(),
            "chart built"
        );
    }
    series
}

fn render(chart: &ChartSpec, primary: &[DailyPoint], secondary: &[DailyPoint]) -> ChartSeries {
    ChartSeries {
        name: chart.name,
        title: chart.title,
        y_label: chart.y_label,
        color: chart.color,
        kind: chart.kind.clone(),
        axis: chart.axis,
        primary: plot_points(primary),
        secondary: secondary_points(primary, secondary),
        y_ticks: chart.axis.tick_labels(),
    }
}

/// Places secondary points on the primary's x positions, matched by date.
fn secondary_points(primary: &[DailyPoint], secondary: &[DailyPoint]) -> Vec<PlotPoint> {
    plot_points(secondary)
        .into_iter()
        .filter_map(|point| {
            let x = primary
                .binary_search_by_key(&point.date, |p| p.date)
                .ok()?;
            Some(PlotPoint { x, ..point })
        })
        .collect()
}

/// Percentage shares `a / (a + b)` and `b / (a + b)` on `first`'s dates. A null input or a zero
/// total yields 0 for both.
pub fn share_series(
    first: &[DailyPoint],
    second: &[DailyPoint],
) -> (Vec<DailyPoint>, Vec<DailyPoint>) {
    lookup_at(first, second)
        .into_iter()
        .zip(first)
        .map(|(b, a)| {
            let (share_a, share_b) = match (a.value, b.value) {
                (Some(x), Some(y)) if x + y != 0.0 => {
                    let total = x + y;
                    (x / total * 100.0, y / total * 100.0)
                }
                _ => (0.0, 0.0),
            };
            (
                DailyPoint::new(a.date, Some(share_a)),
                DailyPoint::new(a.date, Some(share_b)),
            )
        })
        .unzip()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// max > 0
    Valid,
    AllZero,
    /// Only nulls or negatives.
    NoValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub records: usize,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub status: DayStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub metric: String,
    pub window: RangeWindow,
    pub days: Vec<DayAvailability>,
    /// Calendar days in the window with no rows at all.
    pub missing_dates: Vec<NaiveDate>,
    pub first_valid: Option<NaiveDate>,
    pub last_valid: Option<NaiveDate>,
}

/// Per-date coverage of one metric over `window`.
pub fn availability_report(
    records: &[RawRecord],
    metric: &str,
    window: &RangeWindow,
) -> AvailabilityReport {
    let mut by_date: BTreeMap<NaiveDate, (usize, Vec<f64>)> = BTreeMap::new();
    for record in records.iter().filter(|record| window.contains(record.date)) {
        let entry = by_date.entry(record.date).or_default();
        entry.0 += 1;
        entry.1.extend(record.value(metric));
    }

    let days: Vec<DayAvailability> = by_date
        .iter()
        .map(|(date, (count, values))| {
            let max = values.iter().copied().reduce(f64::max);
            let min = values.iter().copied().reduce(f64::min);
            let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);
            let status = match max {
                Some(v) if v > 0.0 => DayStatus::Valid,
                Some(v) if v == 0.0 => DayStatus::AllZero,
                _ => DayStatus::NoValue,
            };
            DayAvailability {
                date: *date,
                records: *count,
                max,
                min,
                mean,
                status,
            }
        })
        .collect();

    // Days before the export's first date are not reported as missing.
    let missing_dates = match records.iter().map(|record| record.date).min() {
        Some(first) => RangeWindow {
            start: window.start.max(first),
            end: window.end,
        }
        .iter_days()
        .filter(|date| !by_date.contains_key(date))
        .collect(),
        None => Vec::new(),
    };
    let mut valid = days
        .iter()
        .filter(|day| day.status == DayStatus::Valid)
        .map(|day| day.date);
    let first_valid = valid.next();
    let last_valid = valid.last().or(first_valid);

    AvailabilityReport {
        metric: metric.to_string(),
        window: *window,
        days,
        missing_dates,
        first_valid,
        last_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{dashboard_4g, dashboard_5g};
    use crate::sampling::{SelectionMode, ValidityPolicy};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn point(d: u32, value: Option<f64>) -> DailyPoint {
        DailyPoint::new(day(d), value)
    }

    #[test]
    fn share_series_handles_zero_and_null() {
        let first = vec![point(1, Some(30.0)), point(2, Some(0.0)), point(3, Some(5.0))];
        let second = vec![point(1, Some(10.0)), point(2, Some(0.0)), point(3, None)];
        let (a, b) = share_series(&first, &second);
        assert_eq!(a, vec![point(1, Some(75.0)), point(2, Some(0.0)), point(3, Some(0.0))]);
        assert_eq!(b, vec![point(1, Some(25.0)), point(2, Some(0.0)), point(3, Some(0.0))]);
    }

    #[test]
    fn dual_line_follower_uses_primary_positions() {
        let mut records = Vec::new();
        for d in 1..=5 {
            let follower = if d == 2 || d == 4 { Some(d as f64) } else { Some(0.0) };
            records.push(
                RawRecord::new(day(d))
                    .with_value("g5_userdl_thp", Some(50.0 + d as f64))
                    .with_value("g5_eut_bhv", follower),
            );
        }
        let spec = dashboard_5g();
        let chart = spec.chart("eut_thp").unwrap();
        let window = RangeWindow::from_records(&records, 35).unwrap();
        let series = build_chart(&records, &DailyTable::default(), &window, chart, Stride::new(2));

        assert_eq!(series.point_count(), 5);
        let xs: Vec<_> = series.secondary.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1, 3]);
        assert_eq!(series.secondary[0].label, "02/01/2024");
    }

    #[test]
    fn gap_aware_chart_applies_percent_after_selection() {
        let values = [0.97, 0.98, 0.99, 0.0, 0.0, 0.991, 0.992, 0.993, 0.994, 0.995];
        let records: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| RawRecord::new(day(i as u32 + 1)).with_value("da_5g", Some(*v)))
            .collect();
        let spec = dashboard_5g();
        let chart = spec.chart("accessibility").unwrap();
        assert_eq!(chart.selection, SelectionMode::GapAware);
        let window = RangeWindow::from_records(&records, 35).unwrap();
        let series = build_chart(&records, &DailyTable::default(), &window, chart, Stride::new(2));

        let dates: Vec<_> = series.primary.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(6), day(8), day(10)]);
        let last = series.primary.last().and_then(|p| p.value).unwrap();
        assert!((last - 99.5).abs() < 1e-9);
        assert!(series.y_ticks.is_some());
    }

    #[test]
    fn shared_table_drops_days_where_every_metric_is_zero() {
        let mut records = Vec::new();
        for d in 1..=4 {
            let traffic = if d == 2 { 0.0 } else { 10.0 };
            records.push(
                RawRecord::new(day(d))
                    .with_entity("A")
                    .with_value("traffic_4g", Some(traffic))
                    .with_value("rrc_ue", Some(0.0)),
            );
            records.push(
                RawRecord::new(day(d))
                    .with_entity("B")
                    .with_value("traffic_4g", Some(traffic)),
            );
        }
        let digest = build_digest(&records, &[dashboard_4g()], &DigestOptions::default());
        let fourg = &digest.dashboards[0];
        assert_eq!(fourg.table_days, 3);

        let traffic = fourg.charts.iter().find(|c| c.name == "traffic").unwrap();
        let values: Vec<_> = traffic.primary.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(20.0), Some(20.0), Some(20.0)]);

        let rrc = fourg.charts.iter().find(|c| c.name == "rrc_user").unwrap();
        assert_eq!(rrc.point_count(), 3);
    }

    #[test]
    fn four_g_availability_floors_then_interpolates() {
        let values = [0.995, 0.98, 0.99, 0.997];
        let records: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| RawRecord::new(day(i as u32 + 1)).with_value("g4_avail_auto", Some(*v)))
            .collect();
        let spec = dashboard_4g();
        let chart = spec.chart("availability").unwrap();
        assert_eq!(chart.policy, ValidityPolicy::PositiveOnly);
        let window = RangeWindow::from_records(&records, 35).unwrap();
        let series = build_chart(&records, &DailyTable::default(), &window, chart, Stride::new(2));

        let dates: Vec<_> = series.primary.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(1), day(3), day(4)]);
        let values: Vec<f64> = series.primary.iter().filter_map(|p| p.value).collect();
        assert!((values[1] - 99.6).abs() < 1e-9);
    }

    #[test]
    fn stacked_share_sums_to_one_hundred() {
        let records: Vec<_> = (1..=3)
            .map(|d| {
                RawRecord::new(day(d))
                    .with_value("traffic_3id", Some(3.0))
                    .with_value("traffic_im3", Some(1.0))
            })
            .collect();
        let digest = build_digest(&records, &[dashboard_4g()], &DigestOptions::default());
        let ratio = digest.dashboards[0]
            .charts
            .iter()
            .find(|c| c.name == "ratio_traffic")
            .unwrap();
        for (a, b) in ratio.primary.iter().zip(&ratio.secondary) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.value.unwrap() + b.value.unwrap(), 100.0);
        }
        assert_eq!(ratio.primary[0].value, Some(75.0));
    }

    #[test]
    fn empty_dataset_builds_empty_charts() {
        let digest = build_digest(&[], &[dashboard_5g(), dashboard_4g()], &DigestOptions::default());
        assert_eq!(digest.window, None);
        assert_eq!(digest.dashboards.len(), 2);
        for dashboard in &digest.dashboards {
            assert_eq!(dashboard.charts.len(), 12);
            assert!(dashboard.charts.iter().all(ChartSeries::is_empty));
            assert!(dashboard.availability.is_none());
        }
    }

    #[test]
    fn availability_report_classifies_days() {
        let records = vec![
            RawRecord::new(day(1)).with_value("avail", Some(0.99)),
            RawRecord::new(day(1)).with_value("avail", Some(0.97)),
            RawRecord::new(day(2)).with_value("avail", Some(0.0)),
            RawRecord::new(day(3)).with_value("avail", None),
            RawRecord::new(day(5)).with_value("avail", Some(1.0)),
        ];
        let window = RangeWindow::trailing(day(5), 4);
        let report = availability_report(&records, "avail", &window);

        let statuses: Vec<_> = report.days.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                DayStatus::Valid,
                DayStatus::AllZero,
                DayStatus::NoValue,
                DayStatus::Valid
            ]
        );
        assert_eq!(report.days[0].records, 2);
        assert_eq!(report.days[0].min, Some(0.97));
        assert!((report.days[0].mean.unwrap() - 0.98).abs() < 1e-9);
        assert_eq!(report.missing_dates, vec![day(4)]);
        assert_eq!(report.first_valid, Some(day(1)));
        assert_eq!(report.last_valid, Some(day(5)));
    }

    #[test]
    fn unbounded_lookback_only_lists_gaps_inside_the_export() {
        let records = vec![
            RawRecord::new(day(2)).with_value("avail", Some(0.99)),
            RawRecord::new(day(5)).with_value("avail", Some(0.98)),
        ];
        let window = RangeWindow::from_records(&records, u32::MAX).unwrap();
        assert_eq!(window.start, NaiveDate::MIN);

        let report = availability_report(&records, "avail", &window);
        assert_eq!(report.missing_dates, vec![day(3), day(4)]);
        assert!(availability_report(&[], "avail", &window).missing_dates.is_empty());
    }

    #[test]
    fn reducer_choice_reaches_the_chart() {
        let records = vec![
            RawRecord::new(day(1)).with_value("traffic_4g", Some(4.0)),
            RawRecord::new(day(1)).with_value("traffic_4g", Some(6.0)),
        ];
        let chart = dashboard_4g().chart("traffic").cloned().unwrap();
        assert_eq!(chart.reducer, Reducer::Sum);
        let window = RangeWindow::from_records(&records, 35).unwrap();
        let table = reduce_daily_gated(&records, &dashboard_4g().table_metrics);
        let series = build_chart(&records, &table, &window, &chart, Stride::new(2));
        assert_eq!(series.primary[0].value, Some(10.0));
    }
}
