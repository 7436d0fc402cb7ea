//! Metric store trait shared by every backend.

use crate::core::{validate_metric_name, Point, Result, Role, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// Series returned by a range query, keyed by metric name
pub type SeriesMap = BTreeMap<String, Vec<Point>>;

/// Which metrics a range query returns
#[derive(Debug, Clone, Copy)]
pub enum MetricSelector<'a> {
    /// Every metric recorded for the role
    All,
    /// Only the named metrics. Each one is present in the result, empty if
    /// nothing was recorded.
    Names(&'a [&'a str]),
}

impl<'a> MetricSelector<'a> {
    /// Rejects malformed metric names before they reach a backend
    pub fn validate(&self) -> Result<()> {
        if let MetricSelector::Names(names) = self {
            for name in names.iter() {
                validate_metric_name(name)?;
            }
        }
        Ok(())
    }

    /// Result map pre-populated with an empty series per requested name
    pub(crate) fn empty_result(&self) -> SeriesMap {
        match self {
            MetricSelector::All => SeriesMap::new(),
            MetricSelector::Names(names) => {
                names.iter().map(|n| ((*n).to_string(), Vec::new())).collect()
            },
        }
    }

    /// True if the metric belongs in the result
    pub(crate) fn matches(&self, metric: &str) -> bool {
        match self {
            MetricSelector::All => true,
            MetricSelector::Names(names) => names.contains(&metric),
        }
    }
}

/// Every fact recorded at a role's newest timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSnapshot {
    /// The newest collection timestamp
    pub ts: Timestamp,
    /// Every metric recorded at `ts`
    pub values: BTreeMap<String, f64>,
}

/// A calendar month holding at least one fact, as `(year, month)`
pub type YearMonth = (i32, u32);

/// Durable set of `(timestamp, role, metric, value)` facts.
///
/// A fact is identified by `(timestamp, role, metric)`. Writing an identity
/// that already exists leaves the stored value untouched.
pub trait MetricStore: Send + Sync {
    /// Stores one fact. Returns `false` if the identity already existed.
    fn insert_fact(&self, role: Role, metric: &str, ts: Timestamp, value: f64) -> Result<bool>;

    /// Stores every fact of one collection snapshot atomically.
    ///
    /// Returns how many facts were new.
    fn insert_facts(&self, role: Role, ts: Timestamp, facts: &[(&str, f64)]) -> Result<usize>;

    /// Time-ordered series for `start <= ts < end`.
    ///
    /// An empty or inverted window yields no points.
    fn query_range(
        &self,
        role: Role,
        selector: MetricSelector<'_>,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<SeriesMap>;

    /// Facts at the role's newest timestamp, `None` for an empty role
    fn latest(&self, role: Role) -> Result<Option<LatestSnapshot>>;

    /// Number of stored facts for a role
    fn fact_count(&self, role: Role) -> Result<usize>;

    /// Number of distinct collection timestamps for a role
    fn distinct_timestamps(&self, role: Role) -> Result<usize>;

    /// Metric names recorded for a role, sorted
    fn available_metrics(&self, role: Role) -> Result<Vec<String>>;

    /// UTC months containing data for a role, oldest first
    fn available_periods(&self, role: Role) -> Result<Vec<YearMonth>>;

    /// Reclaims space and refreshes planner statistics
    fn compact(&self) -> Result<()>;
}
