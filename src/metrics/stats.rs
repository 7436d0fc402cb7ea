//! Summary statistics for chart series and report periods.
//!
//! No-data is always `None`, never zero. Gauge and counter statistics merge
//! associatively and their sums are exact, so a month built from its days and
//! a year built from its months are bit-identical to folding the underlying
//! days in any other grouping.

use crate::core::types::ensure_ascending;
use crate::core::{Point, Timestamp};
use crate::metrics::exact_sum::ExactSum;
use crate::metrics::normalizer::{counter_delta, CounterDelta};
use serde::{Deserialize, Serialize};

/// Min/max/average/current of a chart series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Arithmetic mean, always within `min..=max`
    pub average: f64,
    /// Value of the latest point
    pub current: f64,
}

/// Computes chart statistics, or `None` for an empty series.
pub fn calculate_statistics(points: &[Point]) -> Option<SeriesStatistics> {
    let first = points.first()?;

    let mut min = first.value;
    let mut max = first.value;
    let mut sum = ExactSum::new();
    let mut latest = *first;
    for p in points {
        min = min.min(p.value);
        max = max.max(p.value);
        sum.add(p.value);
        if p.ts >= latest.ts {
            latest = *p;
        }
    }

    Some(SeriesStatistics {
        min,
        max,
        average: mean_within(&sum, points.len() as u64, min, max),
        current: latest.value,
    })
}

/// `sum / count`, clamped so the final division's rounding cannot leave the
/// sample range.
fn mean_within(sum: &ExactSum, count: u64, min: f64, max: f64) -> f64 {
    let mean = sum.value() / count as f64;
    if mean < min {
        min
    } else if mean > max {
        max
    } else {
        mean
    }
}

/// Gauge statistics over a period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GaugeStatsRecord")]
pub struct GaugeStats {
    /// Lowest sample
    pub min: f64,
    /// Time of the first sample equal to `min`
    pub min_time: Timestamp,
    /// Highest sample
    pub max: f64,
    /// Time of the first sample equal to `max`
    pub max_time: Timestamp,
    /// Sample-weighted mean of `sum / sample_count`, within `min..=max`
    pub mean: f64,
    /// Sum of all samples, correctly rounded
    pub sum: f64,
    /// Number of samples
    pub sample_count: u64,
    #[serde(skip)]
    exact_sum: ExactSum,
}

/// Serialized form of [`GaugeStats`]; the exact sum is rebuilt from `sum`.
#[derive(Deserialize)]
struct GaugeStatsRecord {
    min: f64,
    min_time: Timestamp,
    max: f64,
    max_time: Timestamp,
    mean: f64,
    sum: f64,
    sample_count: u64,
}

impl From<GaugeStatsRecord> for GaugeStats {
    fn from(record: GaugeStatsRecord) -> Self {
        GaugeStats {
            min: record.min,
            min_time: record.min_time,
            max: record.max,
            max_time: record.max_time,
            mean: record.mean,
            sum: record.sum,
            sample_count: record.sample_count,
            exact_sum: ExactSum::from(record.sum),
        }
    }
}

impl GaugeStats {
    /// Combines two periods. On equal extremes the receiver's timestamp wins,
    /// so folding children in chronological order keeps the earliest one.
    pub fn merge(&self, other: &GaugeStats) -> GaugeStats {
        let (min, min_time) = if other.min < self.min {
            (other.min, other.min_time)
        } else {
            (self.min, self.min_time)
        };
        let (max, max_time) = if other.max > self.max {
            (other.max, other.max_time)
        } else {
            (self.max, self.max_time)
        };
        let mut exact_sum = self.exact_sum;
        exact_sum.merge(&other.exact_sum);
        let sample_count = self.sample_count + other.sample_count;

        GaugeStats {
            min,
            min_time,
            max,
            max_time,
            mean: mean_within(&exact_sum, sample_count, min, max),
            sum: exact_sum.value(),
            sample_count,
            exact_sum,
        }
    }
}

/// Computes gauge statistics for one period's samples.
///
/// Ties on min or max keep the earliest sample. Returns `None` without samples.
pub fn compute_gauge_stats(points: &[Point]) -> Option<GaugeStats> {
    let mut sorted = points.to_vec();
    ensure_ascending(&mut sorted);

    let first = sorted.first()?;
    let (mut min, mut min_time) = (first.value, first.ts);
    let (mut max, mut max_time) = (first.value, first.ts);
    let mut exact_sum = ExactSum::new();

    for p in &sorted {
        if p.value < min {
            min = p.value;
            min_time = p.ts;
        }
        if p.value > max {
            max = p.value;
            max_time = p.ts;
        }
        exact_sum.add(p.value);
    }
    let sample_count = sorted.len() as u64;

    Some(GaugeStats {
        min,
        min_time,
        max,
        max_time,
        mean: mean_within(&exact_sum, sample_count, min, max),
        sum: exact_sum.value(),
        sample_count,
        exact_sum,
    })
}

/// Counter statistics over a period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "CounterStatsRecord")]
pub struct CounterStats {
    /// Sum of non-negative deltas, `None` when no interval was measurable
    pub total: Option<f64>,
    /// Decreases seen, each counted as one reboot
    pub reboot_count: u32,
    /// Number of raw samples
    pub sample_count: u64,
    #[serde(skip)]
    exact_total: ExactSum,
}

#[derive(Deserialize)]
struct CounterStatsRecord {
    total: Option<f64>,
    reboot_count: u32,
    sample_count: u64,
}

impl From<CounterStatsRecord> for CounterStats {
    fn from(record: CounterStatsRecord) -> Self {
        CounterStats {
            total: record.total,
            reboot_count: record.reboot_count,
            sample_count: record.sample_count,
            exact_total: record.total.map(ExactSum::from).unwrap_or_default(),
        }
    }
}

impl CounterStats {
    /// Combines two periods
    pub fn merge(&self, other: &CounterStats) -> CounterStats {
        let mut exact_total = self.exact_total;
        exact_total.merge(&other.exact_total);
        let measured = self.total.is_some() || other.total.is_some();

        CounterStats {
            total: measured.then(|| exact_total.value()),
            reboot_count: self.reboot_count + other.reboot_count,
            sample_count: self.sample_count + other.sample_count,
            exact_total,
        }
    }
}

/// Exact sum of increases and the number of decreases, `None` for fewer than
/// two values.
fn counter_increase(sorted_values: &[f64]) -> Option<(ExactSum, u32)> {
    if sorted_values.len() < 2 {
        return None;
    }

    let mut total = ExactSum::new();
    let mut reboots = 0;
    for w in sorted_values.windows(2) {
        match counter_delta(w[0], w[1]) {
            CounterDelta::Increase(delta) => total.add(delta),
            CounterDelta::Reset => reboots += 1,
        }
    }
    Some((total, reboots))
}

/// Sums the increases of a time-ordered counter series.
///
/// Each decrease is one reboot and contributes nothing, since the counter's
/// value at the moment of the reboot is unknown. Returns `(None, 0)` for fewer
/// than two values.
pub fn compute_counter_total(sorted_values: &[f64]) -> (Option<f64>, u32) {
    match counter_increase(sorted_values) {
        Some((total, reboots)) => (Some(total.value()), reboots),
        None => (None, 0),
    }
}

/// Computes counter statistics for one period's samples, or `None` without samples.
pub fn compute_counter_stats(points: &[Point]) -> Option<CounterStats> {
    if points.is_empty() {
        return None;
    }

    let mut sorted = points.to_vec();
    ensure_ascending(&mut sorted);
    let values: Vec<f64> = sorted.iter().map(|p| p.value).collect();
    let increase = counter_increase(&values);

    Some(CounterStats {
        total: increase.map(|(total, _)| total.value()),
        reboot_count: increase.map_or(0, |(_, reboots)| reboots),
        sample_count: sorted.len() as u64,
        exact_total: increase.map(|(total, _)| total).unwrap_or_default(),
    })
}

/// Folds child gauge statistics into a parent period.
///
/// Children must be given in chronological order. Empty children are
/// ignored; `None` when nothing remains.
pub fn aggregate_gauge_rollup<'a, I>(children: I) -> Option<GaugeStats>
where
    I: IntoIterator<Item = &'a GaugeStats>,
{
    children
        .into_iter()
        .filter(|s| s.sample_count > 0)
        .fold(None, |acc: Option<GaugeStats>, child| {
            Some(match acc {
                Some(acc) => acc.merge(child),
                None => *child,
            })
        })
}

/// Folds child counter statistics into a parent period, `None` without children.
pub fn aggregate_counter_rollup<'a, I>(children: I) -> Option<CounterStats>
where
    I: IntoIterator<Item = &'a CounterStats>,
{
    children.into_iter().fold(None, |acc: Option<CounterStats>, child| {
        Some(match acc {
            Some(acc) => acc.merge(child),
            None => *child,
        })
    })
}
