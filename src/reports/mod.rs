//! Calendar period statistics for monthly and yearly reports.

pub mod aggregator;
pub mod summary;

pub use aggregator::{day_start, PeriodAggregator};
pub use summary::{
    rollup_summaries, DailySummary, MetricSummary, MonthlySummary, SummaryMap, YearlySummary,
};
