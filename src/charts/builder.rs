//! Store-to-series pipeline for charts.
//!
//! Raw facts are transformed, converted to rates for counters, scaled,
//! binned for the period and summarized. Rendering happens elsewhere.

use super::period::ChartPeriod;
use crate::core::{validate_metric_name, Config, Point, Result, Role, Timestamp};
use crate::metrics::battery::derive_battery_percentage;
use crate::metrics::binner::bin_points;
use crate::metrics::normalizer::CounterNormalizer;
use crate::metrics::registry::{
    chart_metrics, metric_def, metric_kind, metric_scale, transform_value, MetricKind,
    BATTERY_PERCENT,
};
use crate::metrics::stats::{calculate_statistics, SeriesStatistics};
use crate::storage::{MetricSelector, MetricStore};
use serde::Serialize;
use std::collections::BTreeMap;

/// Axis extents for rendering a non-empty series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    /// Left edge of the x axis
    pub x_start: Timestamp,
    /// Right edge of the x axis
    pub x_end: Timestamp,
    /// Bottom of the y axis
    pub y_min: f64,
    /// Top of the y axis
    pub y_max: f64,
}

/// A chart-ready series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Node the series belongs to
    pub role: Role,
    /// Metric name
    pub metric: String,
    /// Chart period the series was built for
    pub period: ChartPeriod,
    /// Final points after normalization and binning
    pub points: Vec<Point>,
    /// `None` when the window held no data
    pub stats: Option<SeriesStatistics>,
    /// `None` when the window held no data
    pub bounds: Option<AxisBounds>,
    /// Counter resets dropped from the window
    pub reboot_count: u32,
}

impl ChartSeries {
    /// True when the window held no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parameters for a single series
#[derive(Debug, Clone, Copy)]
pub struct SeriesRequest<'a> {
    /// Node to chart
    pub role: Role,
    /// Metric to chart
    pub metric: &'a str,
    /// Period deciding lookback and bin width
    pub period: ChartPeriod,
    /// Exclusive end of the window; the window starts one lookback earlier
    pub end: Timestamp,
    /// Overrides the x-axis extent without changing which data is loaded
    pub x_range: Option<(Timestamp, Timestamp)>,
    /// Overrides the registered or data-derived y-axis extent
    pub y_range: Option<(f64, f64)>,
}

impl<'a> SeriesRequest<'a> {
    /// Request for the window ending at `end`, with data-derived bounds
    pub fn new(role: Role, metric: &'a str, period: ChartPeriod, end: Timestamp) -> Self {
        Self {
            role,
            metric,
            period,
            end,
            x_range: None,
            y_range: None,
        }
    }

    /// Fixes the x-axis extent
    pub fn with_x_range(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.x_range = Some((start, end));
        self
    }

    /// Fixes the y-axis extent
    pub fn with_y_range(mut self, min: f64, max: f64) -> Self {
        self.y_range = Some((min, max));
        self
    }

    fn window(&self) -> (Timestamp, Timestamp) {
        (self.end - self.period.lookback_secs(), self.end)
    }
}

/// Data-derived y extent with 10% headroom on both sides.
///
/// A flat series gets a band of 10% of its magnitude, or of 1.0 around zero.
pub fn padded_y_range(min: f64, max: f64) -> (f64, f64) {
    let mut range = max - min;
    if range == 0.0 {
        range = max.abs() * 0.1;
    }
    if range == 0.0 {
        range = 1.0;
    }
    let pad = range * 0.1;
    (min - pad, max + pad)
}

/// Every chart of one role at one reference time
#[derive(Debug, Clone, Serialize)]
pub struct RoleCharts {
    /// Node the charts belong to
    pub role: Role,
    /// Exclusive end shared by every window
    pub end: Timestamp,
    /// One series per chart metric and period
    pub series: Vec<ChartSeries>,
}

/// `metric -> period -> statistics`, the sidecar consumed by the site generator
pub type ChartStatsTable = BTreeMap<String, BTreeMap<ChartPeriod, Option<SeriesStatistics>>>;

impl RoleCharts {
    /// Statistics of every series, keyed by metric then period
    pub fn stats_table(&self) -> ChartStatsTable {
        let mut table = ChartStatsTable::new();
        for series in &self.series {
            table
                .entry(series.metric.clone())
                .or_default()
                .insert(series.period, series.stats);
        }
        table
    }

    /// Finds the series of one metric and period
    pub fn get(&self, metric: &str, period: ChartPeriod) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.metric == metric && s.period == period)
    }
}

/// Builds chart series from a metric store.
pub struct ChartSeriesBuilder<'a, S: MetricStore + ?Sized> {
    store: &'a S,
    companion_min_interval: f64,
    repeater_min_interval: f64,
}

impl<'a, S: MetricStore + ?Sized> ChartSeriesBuilder<'a, S> {
    /// Builder using the default collection cadence
    pub fn new(store: &'a S) -> Self {
        Self::with_config(store, &Config::default())
    }

    /// Builder rejecting counter samples closer than the configured cadence allows
    pub fn with_config(store: &'a S, config: &Config) -> Self {
        Self {
            store,
            companion_min_interval: config.min_counter_interval(Role::Companion),
            repeater_min_interval: config.min_counter_interval(Role::Repeater),
        }
    }

    fn min_interval(&self, role: Role) -> f64 {
        match role {
            Role::Companion => self.companion_min_interval,
            Role::Repeater => self.repeater_min_interval,
        }
    }

    /// Loads and assembles one series.
    pub fn build_series(&self, request: &SeriesRequest<'_>) -> Result<ChartSeries> {
        let metric = validate_metric_name(request.metric)?;
        let stored = if metric == BATTERY_PERCENT {
            request.role.battery_field()
        } else {
            metric
        };

        let (start, end) = request.window();
        let mut series =
            self.store
                .query_range(request.role, MetricSelector::Names(&[stored]), start, end)?;
        if metric == BATTERY_PERCENT {
            derive_battery_percentage(request.role, &mut series);
        }

        let raw = series.get(metric).map(Vec::as_slice).unwrap_or_default();
        Ok(self.assemble(request, raw))
    }

    /// Builds every chart metric of a role for every period, one store query per period.
    pub fn build_role_charts(&self, role: Role, end: Timestamp) -> Result<RoleCharts> {
        let metrics = chart_metrics(role);
        let stored: Vec<&str> = metrics.iter().copied().filter(|m| *m != BATTERY_PERCENT).collect();

        let mut charts = Vec::with_capacity(metrics.len() * ChartPeriod::ALL.len());
        for period in ChartPeriod::ALL {
            let start = end - period.lookback_secs();
            let mut series = self.store.query_range(role, MetricSelector::Names(&stored), start, end)?;
            derive_battery_percentage(role, &mut series);

            for &metric in metrics {
                let request = SeriesRequest::new(role, metric, period, end);
                let raw = series.get(metric).map(Vec::as_slice).unwrap_or_default();
                charts.push(self.assemble(&request, raw));
            }
        }

        Ok(RoleCharts {
            role,
            end,
            series: charts,
        })
    }

    fn assemble(&self, request: &SeriesRequest<'_>, raw: &[Point]) -> ChartSeries {
        let metric = request.metric;
        let scale = metric_scale(metric);
        let values: Vec<Point> = raw
            .iter()
            .map(|p| Point::new(p.ts, transform_value(metric, p.value)))
            .collect();

        let (points, reboot_count) = match metric_kind(metric) {
            MetricKind::Counter => {
                let normalized = CounterNormalizer::new(scale)
                    .with_min_interval(self.min_interval(request.role))
                    .normalize(&values);
                (normalized.points, normalized.reboot_count)
            },
            MetricKind::Gauge => {
                let scaled = values.into_iter().map(|p| Point::new(p.ts, p.value * scale)).collect();
                (scaled, 0)
            },
        };

        let points = bin_points(&points, request.period.bin_width_secs());
        let stats = calculate_statistics(&points);

        let bounds = stats.map(|s| {
            let (x_start, x_end) = request.x_range.unwrap_or_else(|| request.window());
            let fixed = request.y_range.or_else(|| metric_def(metric).and_then(|d| d.y_range));
            let (y_min, y_max) = fixed.unwrap_or_else(|| padded_y_range(s.min, s.max));
            AxisBounds {
                x_start,
                x_end,
                y_min,
                y_max,
            }
        });

        ChartSeries {
            role: request.role,
            metric: metric.to_string(),
            period: request.period,
            points,
            stats,
            bounds,
            reboot_count,
        }
    }
}
