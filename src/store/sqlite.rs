/// Embedded single-file report store.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::time::Duration;

use crate::model::{NewReport, Report, StoreError};

use super::ReportStore;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file. `busy_timeout` bounds how long
    /// a statement waits on a locked database.
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Connect(e.to_string()))?;
        conn.busy_timeout(busy_timeout).map_err(map_sqlite_error)?;
        Ok(Self { conn })
    }
}

fn map_sqlite_error(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
            StoreError::Timeout(err.to_string())
        }
        Some(rusqlite::ErrorCode::CannotOpen) => StoreError::Connect(err.to_string()),
        _ => StoreError::Query(err.to_string()),
    }
}

impl ReportStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn init_schema(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS reports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    flooded INTEGER NOT NULL,
                    level_category TEXT,
                    level_value REAL,
                    created_at TEXT NOT NULL
                        DEFAULT (strftime('%Y-%m-%d %H:%M:%f+00:00', 'now'))
                );
                ",
            )
            .map_err(map_sqlite_error)
    }

    fn append(&mut self, report: &NewReport) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO reports (flooded, level_category, level_value, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    report.flooded,
                    report.level_category,
                    report.level_value,
                    Utc::now()
                ],
            )
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn fetch_all(&mut self) -> Result<Vec<Report>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT flooded, level_category, level_value, created_at
                 FROM reports
                 ORDER BY created_at, id",
            )
            .map_err(map_sqlite_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Report {
                    flooded: row.get(0)?,
                    level_category: row.get(1)?,
                    level_value: row.get(2)?,
                    created_at: row.get::<_, Option<DateTime<Utc>>>(3)?,
                })
            })
            .map_err(map_sqlite_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_error)
    }

    fn trim_retain_recent(&mut self, keep: usize) -> Result<u64, StoreError> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM reports
                 WHERE id NOT IN (
                     SELECT id FROM reports
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?1
                 )",
                params![keep as i64],
            )
            .map_err(map_sqlite_error)?;
        Ok(deleted as u64)
    }
}
