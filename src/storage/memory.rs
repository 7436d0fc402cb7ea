//! In-memory metric store.
//!
//! Keeps facts grouped by `(role, timestamp)` so range queries are a single
//! ordered scan. Used by tests and for ephemeral runs.

use super::backend::{LatestSnapshot, MetricSelector, MetricStore, SeriesMap, YearMonth};
use crate::core::{validate_metric_name, Point, Result, Role, Timestamp};
use chrono::{DateTime, Datelike};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

type Snapshot = BTreeMap<String, f64>;

/// Metric store backed by ordered maps behind a reader-writer lock
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    rows: RwLock<BTreeMap<(Role, Timestamp), Snapshot>>,
}

impl InMemoryMetricStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn year_month(ts: Timestamp) -> Option<YearMonth> {
    DateTime::from_timestamp(ts, 0).map(|dt| (dt.year(), dt.month()))
}

impl MetricStore for InMemoryMetricStore {
    fn insert_fact(&self, role: Role, metric: &str, ts: Timestamp, value: f64) -> Result<bool> {
        validate_metric_name(metric)?;

        let mut rows = self.rows.write();
        let snapshot = rows.entry((role, ts)).or_default();
        if snapshot.contains_key(metric) {
            return Ok(false);
        }
        snapshot.insert(metric.to_string(), value);
        Ok(true)
    }

    fn insert_facts(&self, role: Role, ts: Timestamp, facts: &[(&str, f64)]) -> Result<usize> {
        for (metric, _) in facts {
            validate_metric_name(metric)?;
        }
        if facts.is_empty() {
            return Ok(0);
        }

        let mut rows = self.rows.write();
        let snapshot = rows.entry((role, ts)).or_default();
        let mut inserted = 0;
        for &(metric, value) in facts {
            if !snapshot.contains_key(metric) {
                snapshot.insert(metric.to_string(), value);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn query_range(
        &self,
        role: Role,
        selector: MetricSelector<'_>,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<SeriesMap> {
        selector.validate()?;

        let mut result = selector.empty_result();
        if start >= end {
            return Ok(result);
        }

        let rows = self.rows.read();
        for (&(_, ts), snapshot) in rows.range((role, start)..(role, end)) {
            for (metric, &value) in snapshot {
                if selector.matches(metric) {
                    result.entry(metric.clone()).or_default().push(Point::new(ts, value));
                }
            }
        }
        Ok(result)
    }

    fn latest(&self, role: Role) -> Result<Option<LatestSnapshot>> {
        let rows = self.rows.read();
        let latest = rows
            .range((role, Timestamp::MIN)..=(role, Timestamp::MAX))
            .rev()
            .find(|(_, snapshot)| !snapshot.is_empty())
            .map(|(&(_, ts), snapshot)| LatestSnapshot {
                ts,
                values: snapshot.clone(),
            });
        Ok(latest)
    }

    fn fact_count(&self, role: Role) -> Result<usize> {
        let rows = self.rows.read();
        Ok(rows
            .range((role, Timestamp::MIN)..=(role, Timestamp::MAX))
            .map(|(_, snapshot)| snapshot.len())
            .sum())
    }

    fn distinct_timestamps(&self, role: Role) -> Result<usize> {
        let rows = self.rows.read();
        Ok(rows
            .range((role, Timestamp::MIN)..=(role, Timestamp::MAX))
            .filter(|(_, snapshot)| !snapshot.is_empty())
            .count())
    }

    fn available_metrics(&self, role: Role) -> Result<Vec<String>> {
        let rows = self.rows.read();
        let names: BTreeSet<&String> = rows
            .range((role, Timestamp::MIN)..=(role, Timestamp::MAX))
            .flat_map(|(_, snapshot)| snapshot.keys())
            .collect();
        Ok(names.into_iter().cloned().collect())
    }

    fn available_periods(&self, role: Role) -> Result<Vec<YearMonth>> {
        let rows = self.rows.read();
        let periods: BTreeSet<YearMonth> = rows
            .range((role, Timestamp::MIN)..=(role, Timestamp::MAX))
            .filter(|(_, snapshot)| !snapshot.is_empty())
            .filter_map(|(&(_, ts), _)| year_month(ts))
            .collect();
        Ok(periods.into_iter().collect())
    }

    fn compact(&self) -> Result<()> {
        self.rows.write().retain(|_, snapshot| !snapshot.is_empty());
        Ok(())
    }
}
