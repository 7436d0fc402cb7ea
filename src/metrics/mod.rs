//! Metric classification and the pure series computations.
//!
//! Nothing in here touches storage or logs; every function takes points in
//! and hands points or statistics back.
//!
//! - `registry`: gauge/counter classification, scales, labels
//! - `normalizer`: counter samples to rates, with reboot detection
//! - `binner`: fixed-width averaging for long chart periods
//! - `stats`: chart statistics and associative period statistics
//! - `exact_sum`: lossless summation behind the period statistics
//! - `battery`: charge percentage derived from cell voltage

pub mod battery;
pub mod binner;
pub mod exact_sum;
pub mod normalizer;
pub mod registry;
pub mod stats;

pub use battery::{derive_battery_percentage, voltage_to_percentage};
pub use binner::bin_points;
pub use exact_sum::ExactSum;
pub use normalizer::{normalize_counter, CounterNormalizer, NormalizedCounter};
pub use registry::{metric_def, metric_kind, MetricDef, MetricKind, BATTERY_PERCENT};
pub use stats::{
    aggregate_counter_rollup, aggregate_gauge_rollup, calculate_statistics,
    compute_counter_stats, compute_counter_total, compute_gauge_stats, CounterStats, GaugeStats,
    SeriesStatistics,
};
