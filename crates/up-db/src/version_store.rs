//! Installed-version bookkeeping.
//!
//! Records the high-water mark reached by each successful run in a plain
//! table (`major`, `minor`, `applied_at`) inside the target database. The
//! engine never touches this table; the CLI reads it before a run and
//! appends to it afterwards.

use crate::error::{DbError, DbResult};
use crate::traits::{Database, SqlValue};
use chrono::{NaiveDateTime, Utc};
use up_core::StepVersion;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One recorded run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedVersion {
    /// Version reached
    pub version: StepVersion,
    /// When it was recorded; `None` if the stored value is unreadable
    pub applied_at: Option<NaiveDateTime>,
}

/// Version table accessor
pub struct VersionStore<'a> {
    db: &'a dyn Database,
    table: String,
}

impl<'a> VersionStore<'a> {
    /// Bind to `table` on `db`
    pub fn new(db: &'a dyn Database, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    /// Create the version table if it does not exist.
    pub fn ensure(&self) -> DbResult<()> {
        self.db
            .execute(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                     major      INTEGER NOT NULL,
                     minor      INTEGER NOT NULL,
                     applied_at TIMESTAMP
                 )",
                self.table
            ))
            .map_err(|e| {
                DbError::ExecutionError(format!(
                    "failed to create version table {}: {}",
                    self.table,
                    e.message()
                ))
            })?;
        Ok(())
    }

    /// Highest recorded version, or `0/0` when nothing was recorded yet.
    pub fn current(&self) -> DbResult<StepVersion> {
        self.ensure()?;
        let rows = self.db.query(&format!(
            "SELECT major, minor FROM {} ORDER BY major DESC, minor DESC LIMIT 1",
            self.table
        ))?;
        match rows.first() {
            Some(row) => self.parse_version(row),
            None => Ok(StepVersion::default()),
        }
    }

    /// Append `version` with the current UTC time.
    pub fn record(&self, version: StepVersion) -> DbResult<()> {
        self.ensure()?;
        let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
        self.db.execute_with(
            &format!(
                "INSERT INTO {} (major, minor, applied_at) VALUES (?, ?, CAST(? AS TIMESTAMP))",
                self.table
            ),
            &[
                SqlValue::Int(i64::from(version.major)),
                SqlValue::Int(i64::from(version.minor)),
                SqlValue::Text(now),
            ],
        )?;
        log::debug!("Recorded installed version {version} in {}", self.table);
        Ok(())
    }

    /// Every recorded run, oldest first.
    pub fn history(&self) -> DbResult<Vec<AppliedVersion>> {
        self.ensure()?;
        let rows = self.db.query(&format!(
            "SELECT major, minor, CAST(applied_at AS VARCHAR) FROM {} \
             ORDER BY applied_at, major, minor",
            self.table
        ))?;
        rows.iter()
            .map(|row| {
                Ok(AppliedVersion {
                    version: self.parse_version(row)?,
                    applied_at: row.get(2).cloned().flatten().and_then(|s| parse_timestamp(&s)),
                })
            })
            .collect()
    }

    fn parse_version(&self, row: &[Option<String>]) -> DbResult<StepVersion> {
        let part = |idx: usize| -> DbResult<i32> {
            row.get(idx)
                .cloned()
                .flatten()
                .and_then(|v| v.trim().parse::<i32>().ok())
                .ok_or_else(|| {
                    DbError::ExecutionError(format!(
                        "unreadable version row in {}: {row:?}",
                        self.table
                    ))
                })
        };
        Ok(StepVersion::new(part(0)?, part(1)?))
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f").ok()
}
