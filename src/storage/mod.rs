//! Metric fact storage.
//!
//! This module provides the [`MetricStore`] interface, an in-memory backend
//! and the SQLite backend used in production.

pub mod backend;
pub mod ingest;
pub mod memory;
pub mod sqlite;

// Re-export commonly used types
pub use backend::{LatestSnapshot, MetricSelector, MetricStore, SeriesMap, YearMonth};
pub use ingest::{ingest_payload, lpp_readings, numeric_fields, telemetry_fields, TELEMETRY_PREFIX};
pub use memory::InMemoryMetricStore;
pub use sqlite::SqliteMetricStore;

use crate::core::config::StorageBackendKind;
use crate::core::{Config, Result};
use tracing::debug;

/// Opens the backend selected in the configuration for writing.
pub fn open_store(config: &Config) -> Result<Box<dyn MetricStore>> {
    match config.storage.backend {
        StorageBackendKind::Memory => {
            debug!("Using in-memory metric store");
            Ok(Box::new(InMemoryMetricStore::new()))
        },
        StorageBackendKind::Sqlite => Ok(Box::new(SqliteMetricStore::open(&config.storage.db_path)?)),
    }
}

/// Opens the configured backend for queries only.
///
/// The SQLite backend is opened read-only so reporting never contends with
/// the collector for the write lock.
pub fn open_store_readonly(config: &Config) -> Result<Box<dyn MetricStore>> {
    match config.storage.backend {
        StorageBackendKind::Memory => Ok(Box::new(InMemoryMetricStore::new())),
        StorageBackendKind::Sqlite => {
            Ok(Box::new(SqliteMetricStore::open_readonly(&config.storage.db_path)?))
        },
    }
}
