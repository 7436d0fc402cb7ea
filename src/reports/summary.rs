//! Per-period summary types.

use crate::core::Role;
use crate::metrics::registry::{metric_kind, MetricKind};
use crate::metrics::stats::{
    aggregate_counter_rollup, aggregate_gauge_rollup, CounterStats, GaugeStats,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics of one metric over one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "stats", rename_all = "lowercase")]
pub enum MetricSummary {
    /// Gauge statistics, `None` without samples
    Gauge(Option<GaugeStats>),
    /// Counter statistics, `None` without samples
    Counter(Option<CounterStats>),
}

impl MetricSummary {
    /// A summary with no data for the given kind
    pub fn empty(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Gauge => MetricSummary::Gauge(None),
            MetricKind::Counter => MetricSummary::Counter(None),
        }
    }

    /// Kind the summary was computed as
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSummary::Gauge(_) => MetricKind::Gauge,
            MetricSummary::Counter(_) => MetricKind::Counter,
        }
    }

    /// Gauge statistics if present
    pub fn gauge(&self) -> Option<&GaugeStats> {
        match self {
            MetricSummary::Gauge(stats) => stats.as_ref(),
            MetricSummary::Counter(_) => None,
        }
    }

    /// Counter statistics if present
    pub fn counter(&self) -> Option<&CounterStats> {
        match self {
            MetricSummary::Counter(stats) => stats.as_ref(),
            MetricSummary::Gauge(_) => None,
        }
    }

    /// Number of raw samples behind the summary
    pub fn sample_count(&self) -> u64 {
        match self {
            MetricSummary::Gauge(stats) => stats.map_or(0, |s| s.sample_count),
            MetricSummary::Counter(stats) => stats.map_or(0, |s| s.sample_count),
        }
    }

    /// True when at least one sample contributed
    pub fn has_data(&self) -> bool {
        self.sample_count() > 0
    }
}

/// Summaries keyed by metric name
pub type SummaryMap = BTreeMap<String, MetricSummary>;

/// Rolls child period summaries up into a parent period.
///
/// Children must be in chronological order. Every listed metric appears in
/// the result, dispatched on its registered kind.
pub fn rollup_summaries<'a, I>(metrics: &[&str], children: I) -> SummaryMap
where
    I: IntoIterator<Item = &'a SummaryMap>,
    I::IntoIter: Clone,
{
    let children = children.into_iter();
    metrics
        .iter()
        .map(|&metric| {
            let entries = children.clone().filter_map(|child| child.get(metric));
            let summary = match metric_kind(metric) {
                MetricKind::Gauge => {
                    MetricSummary::Gauge(aggregate_gauge_rollup(entries.filter_map(MetricSummary::gauge)))
                },
                MetricKind::Counter => MetricSummary::Counter(aggregate_counter_rollup(
                    entries.filter_map(MetricSummary::counter),
                )),
            };
            (metric.to_string(), summary)
        })
        .collect()
}

/// One UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Node summarized
    pub role: Role,
    /// UTC calendar day
    pub date: NaiveDate,
    /// Distinct collection timestamps in the day
    pub snapshot_count: usize,
    /// Per-metric statistics for the day
    pub metrics: SummaryMap,
}

/// One calendar month, built from its days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// Node summarized
    pub role: Role,
    /// Calendar year
    pub year: i32,
    /// Calendar month, 1 to 12
    pub month: u32,
    /// Days with at least one snapshot, in date order
    pub daily: Vec<DailySummary>,
    /// Per-metric statistics rolled up from the days
    pub summary: SummaryMap,
}

impl MonthlySummary {
    /// Number of days holding data
    pub fn days_with_data(&self) -> usize {
        self.daily.len()
    }
}

/// One calendar year, built from its months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySummary {
    /// Node summarized
    pub role: Role,
    /// Calendar year
    pub year: i32,
    /// Months with at least one day of data, in order
    pub monthly: Vec<MonthlySummary>,
    /// Per-metric statistics rolled up from the months
    pub summary: SummaryMap,
}

impl YearlySummary {
    /// Number of days holding data across all months
    pub fn days_with_data(&self) -> usize {
        self.monthly.iter().map(MonthlySummary::days_with_data).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point;
    use crate::metrics::stats::{compute_counter_stats, compute_gauge_stats};

    fn day(bat: &[(i64, f64)], recv: &[(i64, f64)]) -> SummaryMap {
        let bat: Vec<Point> = bat.iter().copied().map(Point::from).collect();
        let recv: Vec<Point> = recv.iter().copied().map(Point::from).collect();
        SummaryMap::from([
            ("bat".to_string(), MetricSummary::Gauge(compute_gauge_stats(&bat))),
            ("nb_recv".to_string(), MetricSummary::Counter(compute_counter_stats(&recv))),
        ])
    }

    #[test]
    fn test_rollup_dispatches_on_kind() {
        let days = vec![
            day(&[(0, 4.0)], &[(0, 10.0), (60, 30.0)]),
            day(&[], &[]),
            day(&[(172_800, 2.0), (172_860, 3.0)], &[(172_800, 5.0), (172_860, 1.0)]),
        ];

        let rolled = rollup_summaries(&["bat", "nb_recv", "last_snr"], &days);

        let bat = rolled["bat"].gauge().unwrap();
        assert_eq!(bat.sample_count, 3);
        assert_eq!(bat.mean, 3.0);
        assert_eq!((bat.min, bat.min_time), (2.0, 172_800));

        let recv = rolled["nb_recv"].counter().unwrap();
        assert_eq!(recv.total, Some(20.0));
        assert_eq!(recv.reboot_count, 1);

        assert_eq!(rolled["last_snr"], MetricSummary::Gauge(None));
        assert!(!rolled["last_snr"].has_data());
    }

    #[test]
    fn test_summary_serializes_with_kind_tag() {
        let json = serde_json::to_value(MetricSummary::Counter(None)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "counter", "stats": null }));
    }
}
