//! Shared fixtures for unit tests

use std::cell::RefCell;
use up_db::{ColumnInfo, Database, DbResult, DuckDbBackend, Row, SqlValue};

/// In-memory DuckDB that remembers every statement sent through `execute`
pub(crate) struct RecordingDb {
    inner: DuckDbBackend,
    executed: RefCell<Vec<String>>,
}

impl RecordingDb {
    pub(crate) fn new(setup: &str) -> Self {
        let inner = DuckDbBackend::in_memory().unwrap();
        if !setup.trim().is_empty() {
            inner.conn().execute_batch(setup).unwrap();
        }
        Self {
            inner,
            executed: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.executed.borrow_mut().clear();
    }

    /// First column of every row, NULL as `None`
    pub(crate) fn column(&self, sql: &str) -> Vec<Option<String>> {
        self.inner
            .query(sql)
            .unwrap()
            .into_iter()
            .map(|mut r| r.swap_remove(0))
            .collect()
    }
}

impl Database for RecordingDb {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        self.executed.borrow_mut().push(sql.to_string());
        self.inner.execute(sql)
    }

    fn execute_with(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        self.inner.execute_with(sql, params)
    }

    fn query(&self, sql: &str) -> DbResult<Vec<Row>> {
        self.inner.query(sql)
    }

    fn columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        self.inner.columns(table)
    }

    fn index_names(&self, table: &str) -> DbResult<Vec<String>> {
        self.inner.index_names(table)
    }

    fn views(&self) -> DbResult<Vec<String>> {
        self.inner.views()
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}
