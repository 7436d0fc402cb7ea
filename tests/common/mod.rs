//! Common test utilities and fixtures.

#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use nodemeter_lib::core::{Role, Timestamp};
use nodemeter_lib::storage::{InMemoryMetricStore, MetricStore, SqliteMetricStore};
use tempfile::TempDir;

/// Unix timestamp of a UTC wall-clock time.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap().timestamp()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A store under test plus whatever keeps it alive.
pub struct TestStore {
    pub name: &'static str,
    pub store: Box<dyn MetricStore>,
    _dir: Option<TempDir>,
}

/// One instance of every backend, each empty.
pub fn all_backends() -> Vec<TestStore> {
    let dir = TempDir::new().unwrap();
    let sqlite = SqliteMetricStore::open(dir.path().join("metrics.db")).unwrap();

    vec![
        TestStore {
            name: "memory",
            store: Box::new(InMemoryMetricStore::new()),
            _dir: None,
        },
        TestStore {
            name: "sqlite",
            store: Box::new(sqlite),
            _dir: Some(dir),
        },
    ]
}

/// Fixture builder for seeding a store with regular samples.
pub struct Seeder<'a> {
    store: &'a dyn MetricStore,
    role: Role,
}

impl<'a> Seeder<'a> {
    pub fn new(store: &'a dyn MetricStore, role: Role) -> Self {
        Self { store, role }
    }

    /// `count` samples of `metric`, `step` seconds apart, valued by `value(i)`.
    pub fn series(
        &self,
        metric: &str,
        start: Timestamp,
        step: i64,
        count: usize,
        value: impl Fn(usize) -> f64,
    ) -> &Self {
        for i in 0..count {
            let ts = start + i as i64 * step;
            self.store.insert_fact(self.role, metric, ts, value(i)).unwrap();
        }
        self
    }

    /// Explicit `(timestamp, value)` samples.
    pub fn points(&self, metric: &str, points: &[(Timestamp, f64)]) -> &Self {
        for &(ts, value) in points {
            self.store.insert_fact(self.role, metric, ts, value).unwrap();
        }
        self
    }
}
