//! Nodemeter - time-series statistics for two monitored mesh nodes.
//!
//! Periodic readings from a companion node and a remote repeater are stored as
//! individual facts and turned into chart-ready series and calendar reports.
//! Monotonic counters that reset on reboot are converted to rates without
//! ever producing a negative value.
//!
//! # Architecture
//!
//! - `core`: roles, points, configuration and errors
//! - `metrics`: metric registry, counter normalization, binning, statistics
//! - `storage`: the `MetricStore` trait with in-memory and SQLite backends
//! - `reports`: daily, monthly and yearly summaries
//! - `charts`: day/week/month/year chart series
//! - `export`: JSON documents for reports and chart statistics
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use nodemeter_lib::charts::{ChartPeriod, ChartSeriesBuilder, SeriesRequest};
//! use nodemeter_lib::core::Role;
//! use nodemeter_lib::storage::{MetricStore, SqliteMetricStore};
//!
//! fn main() -> nodemeter_lib::Result<()> {
//!     let store = SqliteMetricStore::open("./data/state/metrics.db")?;
//!     store.insert_fact(Role::Repeater, "bat", 1_700_000_000, 3_912.0)?;
//!
//!     let request = SeriesRequest::new(Role::Repeater, "bat", ChartPeriod::Week, 1_700_000_060);
//!     let series = ChartSeriesBuilder::new(&store).build_series(&request)?;
//!     println!("{:?}", series.stats);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod charts;
pub mod cli;
pub mod core;
pub mod export;
pub mod metrics;
pub mod reports;
pub mod storage;

// Re-export core types for convenience
pub use crate::core::{Config, NodemeterError, Result};
