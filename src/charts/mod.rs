//! Chart series for the day, week, month and year views.

pub mod builder;
pub mod period;

pub use builder::{
    padded_y_range, AxisBounds, ChartSeries, ChartSeriesBuilder, ChartStatsTable, RoleCharts,
    SeriesRequest,
};
pub use period::{calendar_year_bounds, ChartPeriod};
