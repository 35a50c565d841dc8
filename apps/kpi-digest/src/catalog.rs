//! KPI chart catalog for the 5G and 4G dashboard slides.

use crate::chart::{
    AxisStyle, ChartKind, TickFormat, ValueTransform, COLOR_AREA, COLOR_PRIMARY, COLOR_SECONDARY,
};
use crate::sampling::{MetricSpec, Reducer, SelectionMode, ValidityPolicy};
use std::collections::BTreeSet;

/// Where a chart's daily series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    /// Reduced on its own from the raw rows, then clipped to the range window.
    PerMetric,
    /// Read from the dashboard's shared table, which keeps only dates where some metric is
    /// positive.
    SharedTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionMetric {
    pub metric: &'static str,
    pub reducer: Reducer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub y_label: &'static str,
    pub metric: &'static str,
    pub reducer: Reducer,
    pub policy: ValidityPolicy,
    pub selection: SelectionMode,
    pub source: SeriesSource,
    /// Drop values below this after the policy.
    pub floor: Option<f64>,
    /// Run the display interpolator with this threshold after selection.
    pub interpolate_threshold: Option<f64>,
    pub transform: ValueTransform,
    pub kind: ChartKind,
    /// Follower (dual charts) or stacked partner.
    pub companion: Option<CompanionMetric>,
    pub axis: AxisStyle,
    pub color: &'static str,
}

impl ChartSpec {
    fn new(name: &'static str, title: &'static str, y_label: &'static str) -> Self {
        Self {
            name,
            title,
            y_label,
            metric: name,
            reducer: Reducer::Max,
            policy: ValidityPolicy::NotNullOnly,
            selection: SelectionMode::EveryDay,
            source: SeriesSource::PerMetric,
            floor: None,
            interpolate_threshold: None,
            transform: ValueTransform::Identity,
            kind: ChartKind::Line,
            companion: None,
            axis: AxisStyle::auto(),
            color: COLOR_PRIMARY,
        }
    }

    fn metric(mut self, metric: &'static str, reducer: Reducer) -> Self {
        self.metric = metric;
        self.reducer = reducer;
        self
    }

    fn policy(mut self, policy: ValidityPolicy, selection: SelectionMode) -> Self {
        self.policy = policy;
        self.selection = selection;
        self
    }

    fn shared_table(mut self) -> Self {
        self.source = SeriesSource::SharedTable;
        self
    }

    fn floor(mut self, floor: f64) -> Self {
        self.floor = Some(floor);
        self
    }

    fn interpolate(mut self, threshold: f64) -> Self {
        self.interpolate_threshold = Some(threshold);
        self
    }

    fn transform(mut self, transform: ValueTransform) -> Self {
        self.transform = transform;
        self
    }

    fn kind(mut self, kind: ChartKind) -> Self {
        self.kind = kind;
        self
    }

    fn companion(mut self, metric: &'static str, reducer: Reducer) -> Self {
        self.companion = Some(CompanionMetric { metric, reducer });
        self
    }

    fn axis(mut self, axis: AxisStyle) -> Self {
        self.axis = axis;
        self
    }

    fn color(mut self, color: &'static str) -> Self {
        self.color = color;
        self
    }

    /// Metric columns this chart reads.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.metric];
        if let Some(companion) = &self.companion {
            columns.push(companion.metric);
        }
        columns
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSpec {
    pub key: &'static str,
    pub slide_title: &'static str,
    /// Metrics reduced together into the shared (gated) daily table.
    pub table_metrics: Vec<MetricSpec>,
    /// In slide order.
    pub charts: Vec<ChartSpec>,
}

impl DashboardSpec {
    pub fn chart(&self, name: &str) -> Option<&ChartSpec> {
        self.charts.iter().find(|chart| chart.name == name)
    }
}

fn availability_axis() -> AxisStyle {
    AxisStyle::fixed(99.0, 100.2, 0.2, TickFormat::Percent(2))
}

pub fn dashboard_5g() -> DashboardSpec {
    use SelectionMode::*;
    use ValidityPolicy::*;

    let charts = vec![
        ChartSpec::new("availability", "Availability", "%")
            .metric("avail_auto_5g", Reducer::Max)
            .policy(PositiveOnly, EveryDay)
            .interpolate(0.0)
            .transform(ValueTransform::Percent)
            .axis(availability_axis()),
        ChartSpec::new("accessibility", "Accessibility", "%")
            .metric("da_5g", Reducer::Max)
            .policy(PositiveOnly, GapAware)
            .transform(ValueTransform::Percent)
            .axis(AxisStyle::fixed(96.0, 101.0, 1.0, TickFormat::Percent(2))),
        ChartSpec::new("cdr", "Call Drop Rate", "%")
            .metric("g5_cdr", Reducer::Max)
            .policy(NonNegative, FixedStride)
            .transform(ValueTransform::Percent)
            .axis(AxisStyle::fixed(0.0, 0.016, 0.002, TickFormat::Percent(3)).with_clip_min(0.0)),
        ChartSpec::new("sgnb_sr", "Sgnb addition SR", "%")
            .metric("sgnb_addition_sr", Reducer::Max)
            .policy(PositiveOnly, GapAware)
            .transform(ValueTransform::Percent)
            .axis(availability_axis().with_clip_min(0.0)),
        ChartSpec::new("traffic", "Total Traffic (GB)", "GB")
            .metric("traffic_5g", Reducer::Max)
            .policy(NotNullOnly, GapAware)
            .kind(ChartKind::Area)
            .axis(AxisStyle::fixed(0.0, 50_000.0, 5_000.0, TickFormat::Grouped))
            .color(COLOR_AREA),
        ChartSpec::new("eut_thp", "EUT vs DL User Thp", "Value")
            .metric("g5_userdl_thp", Reducer::Max)
            .policy(PositiveOnly, EveryDay)
            .kind(ChartKind::DualLine {
                primary_label: "g5_userdl_thp",
                follower_label: "g5_eut_bhv",
            })
            .companion("g5_eut_bhv", Reducer::Max)
            .axis(AxisStyle::fixed(0.0, 120.0, 20.0, TickFormat::Plain(0)))
            .color(COLOR_SECONDARY),
        ChartSpec::new("user_5g", "User 5G", "Users")
            .metric("sum_en_dc_user_5g_wd", Reducer::Max)
            .policy(NotNullOnly, FixedStride)
            .kind(ChartKind::Bar)
            .axis(AxisStyle::fixed(0.0, 400_000.0, 50_000.0, TickFormat::Kilo)),
        ChartSpec::new("prb_util", "DL PRB Util", "PRB Util (%)")
            .metric("g5_dlprb_util", Reducer::Max)
            .policy(PositiveOnly, GapAware)
            .transform(ValueTransform::Percent)
            .kind(ChartKind::LineBar {
                primary_label: "5G_DL_PRB_UTIL (%)",
                follower_label: "#Cells_DL PRB>85%",
                follower_axis: AxisStyle::fixed(0.0, 10.0, 1.0, TickFormat::Plain(0)),
            })
            .companion("dl_prb_util_5g_count_gt_085", Reducer::Max)
            .axis(AxisStyle::fixed(0.0, 50.0, 5.0, TickFormat::Percent(0))),
        ChartSpec::new("inter_esgnb", "inter_esgnb_pscell_change", "%")
            .metric("inter_esgnb", Reducer::Max)
            .policy(NotNullOnly, FixedStride)
            .transform(ValueTransform::Percent)
            .axis(AxisStyle::fixed(0.0, 120.0, 20.0, TickFormat::Percent(2))),
        ChartSpec::new("intra_esgnb", "intra_esgnb_pscell_change", "%")
            .metric("intra_esgnb", Reducer::Max)
            .policy(PositiveOnly, GapAware)
            .transform(ValueTransform::Percent)
            .axis(AxisStyle::fixed(99.8, 100.02, 0.02, TickFormat::Percent(2))),
        ChartSpec::new("intra_sgnb", "intra_sgnb_intrafreq_pscell_change", "%")
            .metric("intra_sgnb_intrafreq", Reducer::Max)
            .policy(PositiveOnly, GapAware)
            .transform(ValueTransform::Percent)
            .axis(AxisStyle::fixed(99.8, 100.02, 0.02, TickFormat::Percent(2))),
        ChartSpec::new("inter_sgnb", "inter_sgnb_intrafreq_pscell_change", "%")
            .metric("inter_sgnb_intrafreq", Reducer::Max)
            .policy(PositiveOnly, GapAware)
            .transform(ValueTransform::Percent)
            .axis(AxisStyle::fixed(99.0, 100.1, 0.1, TickFormat::Percent(1))),
    ];

    let table_metrics = [
        ("da_5g", Reducer::Max),
        ("g5_cdr", Reducer::Max),
        ("sgnb_addition_sr", Reducer::Max),
        ("traffic_5g", Reducer::Sum),
        ("g5_userdl_thp", Reducer::Max),
        ("sum_en_dc_user_5g_wd", Reducer::Max),
        ("g5_dlprb_util", Reducer::Max),
        ("inter_esgnb", Reducer::Max),
        ("intra_esgnb", Reducer::Max),
        ("inter_sgnb_intrafreq", Reducer::Max),
        ("intra_sgnb_intrafreq", Reducer::Max),
    ]
    .into_iter()
    .map(|(metric, reducer)| MetricSpec::new(metric, reducer))
    .collect();

    DashboardSpec {
        key: "5g",
        slide_title: "KPI MONITORING 5G EAST JAVA",
        table_metrics,
        charts,
    }
}

/// 4G charts other than availability show every gated day of the shared table.
fn table_chart(
    name: &'static str,
    title: &'static str,
    y_label: &'static str,
    metric: &'static str,
    reducer: Reducer,
) -> ChartSpec {
    ChartSpec::new(name, title, y_label)
        .metric(metric, reducer)
        .policy(ValidityPolicy::NotNullOnly, SelectionMode::EveryDay)
        .shared_table()
}

pub fn dashboard_4g() -> DashboardSpec {
    let charts = vec![
        ChartSpec::new("availability", "Availability", "%")
            .metric("g4_avail_auto", Reducer::Max)
            .policy(ValidityPolicy::PositiveOnly, SelectionMode::EveryDay)
            .floor(0.99)
            .interpolate(0.99)
            .transform(ValueTransform::Percent)
            .axis(availability_axis()),
        table_chart("s1sr", "S1SR", "%", "s1_failure", Reducer::Max)
            .transform(ValueTransform::ComplementPercent),
        table_chart("rrc_user", "RRC Conn User", "Users", "rrc_ue", Reducer::Max),
        table_chart("traffic", "Traffic 4G (GB)", "GB", "traffic_4g", Reducer::Sum)
            .kind(ChartKind::Area)
            .color(COLOR_AREA),
        table_chart("eut", "EUT", "Mbps", "eut_4g_bh", Reducer::Max).color(COLOR_SECONDARY),
        table_chart("prb_util", "DL PRB Util", "%", "dl_prb_util", Reducer::Max)
            .transform(ValueTransform::Percent)
            .kind(ChartKind::Bar),
        table_chart("cqi", "CQI", "CQI", "cqi_bh", Reducer::Max).color(COLOR_SECONDARY),
        table_chart("qpsk", "QPSK", "Mbps", "dl_user_thp_bhv", Reducer::Max),
        table_chart("traffic_split", "Traffic 4G - 5G", "GB", "traffic_3id", Reducer::Sum)
            .kind(ChartKind::Stacked {
                first_label: "traffic_3id",
                second_label: "traffic_im3",
            })
            .companion("traffic_im3", Reducer::Sum),
        table_chart("ratio_traffic", "Ratio traffic 4G - 5G", "%", "traffic_3id", Reducer::Sum)
            .kind(ChartKind::StackedShare {
                first_label: "3ID",
                second_label: "IM3",
            })
            .companion("traffic_im3", Reducer::Sum),
        table_chart("user_split", "RRC Conn 4G - 5G", "Users", "user_3id", Reducer::Sum)
            .kind(ChartKind::Stacked {
                first_label: "user_3id",
                second_label: "user_im3",
            })
            .companion("user_im3", Reducer::Sum),
        table_chart("ratio_user", "RRC Conn 4G - 5G", "%", "user_3id", Reducer::Sum)
            .kind(ChartKind::StackedShare {
                first_label: "user_3ID",
                second_label: "user_IM3",
            })
            .companion("user_im3", Reducer::Sum),
    ];

    let table_metrics = [
        ("s1_failure", Reducer::Max),
        ("rrc_ue", Reducer::Max),
        ("traffic_4g", Reducer::Sum),
        ("eut_4g_bh", Reducer::Max),
        ("dl_prb_util", Reducer::Max),
        ("cqi_bh", Reducer::Max),
        ("traffic_3id", Reducer::Sum),
        ("traffic_im3", Reducer::Sum),
        ("user_3id", Reducer::Sum),
        ("user_im3", Reducer::Sum),
        ("dl_user_thp_bhv", Reducer::Max),
    ]
    .into_iter()
    .map(|(metric, reducer)| MetricSpec::new(metric, reducer))
    .collect();

    DashboardSpec {
        key: "4g",
        slide_title: "KPI MONITORING 4G EAST JAVA",
        table_metrics,
        charts,
    }
}

pub fn dashboards() -> Vec<DashboardSpec> {
    vec![dashboard_5g(), dashboard_4g()]
}

/// Every metric column any dashboard reads, sorted and deduplicated.
pub fn required_columns(dashboards: &[DashboardSpec]) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for dashboard in dashboards {
        for chart in &dashboard.charts {
            columns.extend(chart.columns().into_iter().map(str::to_string));
        }
        columns.extend(dashboard.table_metrics.iter().map(|spec| spec.metric.clone()));
    }
    columns.into_iter().collect()
}
