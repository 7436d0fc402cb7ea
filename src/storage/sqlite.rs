//! SQLite-backed metric store.
//!
//! One row per fact in a long `(ts, role, metric, value)` table, so new
//! firmware fields need no migration. The primary key is the fact identity
//! and duplicate writes are ignored by the database itself.

use super::backend::{LatestSnapshot, MetricSelector, MetricStore, SeriesMap, YearMonth};
use crate::core::{validate_metric_name, NodemeterError, Point, Result, Role, Timestamp};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_VERSION: i64 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS metrics (
    ts INTEGER NOT NULL,
    role TEXT NOT NULL,
    metric TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (ts, role, metric)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_metrics_role_ts ON metrics(role, ts);

CREATE TABLE IF NOT EXISTS db_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const INSERT_FACT: &str =
    "INSERT OR IGNORE INTO metrics (ts, role, metric, value) VALUES (?1, ?2, ?3, ?4)";

/// Metric store persisted in a single SQLite file
pub struct SqliteMetricStore {
    conn: Mutex<Connection>,
}

impl SqliteMetricStore {
    /// Opens or creates the database, creating parent directories as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self::init(conn)?;
        info!("Opened metric store at {}", path.display());
        Ok(store)
    }

    /// Opens an existing database for reading only.
    pub fn open_readonly<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NodemeterError::storage(format!(
                "Metric database not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        debug!("Opened metric store read-only at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO db_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let version: Option<String> = conn
            .query_row("SELECT value FROM db_meta WHERE key = 'schema_version'", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(version.and_then(|v| v.parse().ok()))
    }
}

impl MetricStore for SqliteMetricStore {
    fn insert_fact(&self, role: Role, metric: &str, ts: Timestamp, value: f64) -> Result<bool> {
        validate_metric_name(metric)?;

        let conn = self.conn.lock();
        let changed = conn
            .prepare_cached(INSERT_FACT)?
            .execute(params![ts, role.as_str(), metric, value])?;
        Ok(changed == 1)
    }

    fn insert_facts(&self, role: Role, ts: Timestamp, facts: &[(&str, f64)]) -> Result<usize> {
        for (metric, _) in facts {
            validate_metric_name(metric)?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_FACT)?;
            for &(metric, value) in facts {
                inserted += stmt.execute(params![ts, role.as_str(), metric, value])?;
            }
        }
        tx.commit()?;
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

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT ts, metric, value FROM metrics
             WHERE role = ?1 AND ts >= ?2 AND ts < ?3
             ORDER BY ts ASC",
        )?;
        let rows = stmt.query_map(params![role.as_str(), start, end], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
        })?;

        for row in rows {
            let (ts, metric, value) = row?;
            if selector.matches(&metric) {
                result.entry(metric).or_default().push(Point::new(ts, value));
            }
        }
        Ok(result)
    }

    fn latest(&self, role: Role) -> Result<Option<LatestSnapshot>> {
        let conn = self.conn.lock();
        let ts: Option<i64> = conn.query_row(
            "SELECT MAX(ts) FROM metrics WHERE role = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )?;
        let Some(ts) = ts else {
            return Ok(None);
        };

        let mut stmt = conn.prepare_cached(
            "SELECT metric, value FROM metrics WHERE role = ?1 AND ts = ?2 ORDER BY metric",
        )?;
        let values = stmt
            .query_map(params![role.as_str(), ts], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<String, f64>>>()?;

        Ok(Some(LatestSnapshot { ts, values }))
    }

    fn fact_count(&self, role: Role) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM metrics WHERE role = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn distinct_timestamps(&self, role: Role) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT ts) FROM metrics WHERE role = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn available_metrics(&self, role: Role) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT metric FROM metrics WHERE role = ?1 ORDER BY metric",
        )?;
        let names = stmt
            .query_map(params![role.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn available_periods(&self, role: Role) -> Result<Vec<YearMonth>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT
                CAST(strftime('%Y', ts, 'unixepoch') AS INTEGER) AS year,
                CAST(strftime('%m', ts, 'unixepoch') AS INTEGER) AS month
             FROM metrics WHERE role = ?1
             ORDER BY year, month",
        )?;
        let periods = stmt
            .query_map(params![role.as_str()], |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<YearMonth>>>()?;
        Ok(periods)
    }

    fn compact(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("VACUUM; ANALYZE;")?;
        info!("Compacted metric store");
        Ok(())
    }
}
