//! Catalog introspection helpers
//!
//! Some drivers fold unquoted identifiers to lower case while manifests are
//! written in upper case, so every lookup here tries the name as written
//! first and then its lower-case form.

use crate::error::DbResult;
use crate::traits::Database;

/// Coarse SQL type family of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// Integer, decimal and floating point types
    Numeric,
    /// Boolean
    Boolean,
    /// Timestamp / datetime
    Timestamp,
    /// Date
    Date,
    /// Character types
    Text,
    /// Anything else (blobs, json, uuid...)
    Other,
}

impl SqlType {
    /// Classify a declared type name (`INTEGER`, `VARCHAR(20)`, `DECIMAL(18,3)`...)
    pub fn from_type_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "BIT" | "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT2" | "INT4" | "INT8"
            | "BIGINT" | "HUGEINT" | "UTINYINT" | "USMALLINT" | "UINTEGER" | "UBIGINT"
            | "FLOAT" | "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" | "DOUBLE PRECISION"
            | "NUMERIC" | "DECIMAL" | "SERIAL" | "BIGSERIAL" => SqlType::Numeric,
            "BOOLEAN" | "BOOL" => SqlType::Boolean,
            "TIMESTAMP" | "DATETIME" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ"
            | "TIMESTAMP_NS" | "TIMESTAMP_MS" | "TIMESTAMP_S" => SqlType::Timestamp,
            "DATE" => SqlType::Date,
            "VARCHAR" | "CHAR" | "CHARACTER" | "CHARACTER VARYING" | "TEXT" | "STRING"
            | "BPCHAR" | "CLOB" | "NVARCHAR" | "NCHAR" => SqlType::Text,
            _ => SqlType::Other,
        }
    }

    /// Whether values of this type are written without quotes
    pub fn is_numeric(self) -> bool {
        self == SqlType::Numeric
    }
}

/// One column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name as stored in the catalog
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Type family
    pub sql_type: SqlType,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Declared character length, when the driver reports one
    pub size: Option<u32>,
}

/// Columns of `table`, retrying with the lower-cased name.
///
/// An empty result means the table does not exist.
pub fn table_columns(db: &dyn Database, table: &str) -> DbResult<Vec<ColumnInfo>> {
    let columns = db.columns(table)?;
    if !columns.is_empty() {
        return Ok(columns);
    }
    let lower = table.to_lowercase();
    if lower != table {
        return db.columns(&lower);
    }
    Ok(columns)
}

/// Find a column by case-insensitive name
pub fn find_column<'a>(columns: &'a [ColumnInfo], name: &str) -> Option<&'a ColumnInfo> {
    columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Whether `column` of `table` holds numeric values.
///
/// Unknown columns are treated as non-numeric.
pub fn is_numeric(db: &dyn Database, table: &str, column: &str) -> DbResult<bool> {
    let columns = table_columns(db, table)?;
    Ok(find_column(&columns, column.trim()).is_some_and(|c| c.sql_type.is_numeric()))
}

/// Whether an index or constraint named `index` exists on `table`.
///
/// Index names compare case-insensitively.
pub fn index_exists(db: &dyn Database, table: &str, index: &str) -> DbResult<bool> {
    let matches = |names: &[String]| names.iter().any(|n| n.eq_ignore_ascii_case(index));

    if matches(&db.index_names(table)?) {
        return Ok(true);
    }
    let lower = table.to_lowercase();
    if lower != table && matches(&db.index_names(&lower)?) {
        return Ok(true);
    }
    Ok(false)
}
