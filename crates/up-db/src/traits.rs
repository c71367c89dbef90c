//! Database trait definition

use crate::catalog::ColumnInfo;
use crate::error::{DbError, DbResult};

/// One result row; `None` is SQL NULL
pub type Row = Vec<Option<String>>;

/// A bound statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text; the driver casts it to the target column type
    Text(String),
}

/// Synchronous database abstraction for the alignment engine
///
/// The engine runs one statement at a time against one borrowed connection.
/// Every statement and cursor is released before a method returns.
pub trait Database {
    /// Execute SQL that modifies data or schema, returns affected rows
    fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute a parameterized statement, returns affected rows.
    ///
    /// Implementations cache the prepared form keyed by `sql`, so a
    /// statement text built once can be re-run cheaply for every row.
    fn execute_with(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Run a query and collect every row as text
    fn query(&self, sql: &str) -> DbResult<Vec<Row>>;

    /// Columns of a table in ordinal order; empty if the table is unknown.
    ///
    /// `table` may be schema-qualified. No case folding is applied.
    fn columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>>;

    /// Names of indexes and constraints defined on a table
    fn index_names(&self, table: &str) -> DbResult<Vec<String>>;

    /// All user views, schema-qualified where the catalog reports a schema
    fn views(&self) -> DbResult<Vec<String>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Start a transaction
    fn begin(&self) -> DbResult<()> {
        self.execute("BEGIN TRANSACTION")
            .map(|_| ())
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {}", e.message())))
    }

    /// Commit the current transaction
    fn commit(&self) -> DbResult<()> {
        self.execute("COMMIT")
            .map(|_| ())
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {}", e.message())))
    }

    /// Roll back the current transaction
    fn rollback(&self) -> DbResult<()> {
        self.execute("ROLLBACK")
            .map(|_| ())
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {}", e.message())))
    }
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
/// error.
///
/// The body's error type only needs to absorb [`DbError`], so engine errors
/// flow through unchanged.
pub fn with_transaction<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<DbError>,
{
    db.begin()?;

    let result = body();

    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                let _ = db.rollback();
                return Err(commit_err.into());
            }
        }
        Err(_) => {
            if let Err(e) = db.rollback() {
                log::warn!("{e}");
            }
        }
    }
    result
}
