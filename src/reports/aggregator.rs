//! Day, month and year statistics from stored facts.
//!
//! Days are UTC calendar days `[00:00, next 00:00)`. Months are rolled up from
//! their days and years from their months, never recomputed from raw facts,
//! so totals stay consistent across levels.

use super::summary::{rollup_summaries, DailySummary, MetricSummary, MonthlySummary, YearlySummary};
use crate::core::{NodemeterError, Point, Result, Role, Timestamp};
use crate::metrics::battery::derive_battery_percentage;
use crate::metrics::registry::{
    metric_kind, report_metrics, transform_value, MetricKind, BATTERY_PERCENT,
};
use crate::metrics::stats::{compute_counter_stats, compute_gauge_stats};
use crate::storage::{MetricSelector, MetricStore};
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::BTreeSet;

const SECONDS_PER_DAY: i64 = 86_400;

/// Start of a UTC day as a Unix timestamp
pub fn day_start(date: NaiveDate) -> Timestamp {
    date.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp())
}

/// Builds daily, monthly and yearly summaries for one store.
pub struct PeriodAggregator<'a, S: MetricStore + ?Sized> {
    store: &'a S,
    as_of: NaiveDate,
}

impl<'a, S: MetricStore + ?Sized> PeriodAggregator<'a, S> {
    /// Aggregator that ignores days after today (UTC)
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            as_of: Utc::now().date_naive(),
        }
    }

    /// Treat `date` as today. Later days are never aggregated.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = date;
        self
    }

    /// Summarizes one UTC day.
    ///
    /// Every report metric of the role is present; metrics without samples
    /// carry no statistics.
    pub fn aggregate_daily(&self, role: Role, date: NaiveDate) -> Result<DailySummary> {
        let metrics = report_metrics(role);
        let stored: Vec<&str> = metrics.iter().copied().filter(|m| *m != BATTERY_PERCENT).collect();

        let start = day_start(date);
        let end = start + SECONDS_PER_DAY;
        let mut series = self.store.query_range(role, MetricSelector::Names(&stored), start, end)?;

        let snapshot_count = series
            .values()
            .flatten()
            .map(|p| p.ts)
            .collect::<BTreeSet<_>>()
            .len();

        derive_battery_percentage(role, &mut series);

        let summaries = metrics
            .iter()
            .map(|&metric| {
                let points: Vec<Point> = series
                    .get(metric)
                    .map(|raw| {
                        raw.iter()
                            .map(|p| Point::new(p.ts, transform_value(metric, p.value)))
                            .collect()
                    })
                    .unwrap_or_default();

                let summary = match metric_kind(metric) {
                    MetricKind::Gauge => MetricSummary::Gauge(compute_gauge_stats(&points)),
                    MetricKind::Counter => MetricSummary::Counter(compute_counter_stats(&points)),
                };
                (metric.to_string(), summary)
            })
            .collect();

        Ok(DailySummary {
            role,
            date,
            snapshot_count,
            metrics: summaries,
        })
    }

    /// Summarizes a calendar month from its days with data.
    ///
    /// Days after the as-of date are skipped.
    pub fn aggregate_monthly(&self, role: Role, year: i32, month: u32) -> Result<MonthlySummary> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            NodemeterError::validation(format!("Invalid month: {}-{:02}", year, month))
        })?;

        let mut daily = Vec::new();
        for date in first.iter_days().take_while(|d| d.month() == month) {
            if date > self.as_of {
                break;
            }
            let day = self.aggregate_daily(role, date)?;
            if day.snapshot_count > 0 {
                daily.push(day);
            }
        }

        let summary = rollup_summaries(report_metrics(role), daily.iter().map(|d| &d.metrics));

        Ok(MonthlySummary {
            role,
            year,
            month,
            daily,
            summary,
        })
    }

    /// Summarizes a calendar year from its months with data.
    pub fn aggregate_yearly(&self, role: Role, year: i32) -> Result<YearlySummary> {
        let mut monthly = Vec::new();
        for month in 1..=12 {
            let starts_after_as_of = NaiveDate::from_ymd_opt(year, month, 1)
                .map_or(true, |first| first > self.as_of);
            if starts_after_as_of {
                break;
            }
            let summary = self.aggregate_monthly(role, year, month)?;
            if !summary.daily.is_empty() {
                monthly.push(summary);
            }
        }

        let summary = rollup_summaries(report_metrics(role), monthly.iter().map(|m| &m.summary));

        Ok(YearlySummary {
            role,
            year,
            monthly,
            summary,
        })
    }
}
