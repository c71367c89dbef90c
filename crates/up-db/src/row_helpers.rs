//! Shared helpers for reading DuckDB row columns as strings.

use crate::traits::{Row, SqlValue};

/// Read a column value as text, trying multiple DuckDB types.
///
/// DuckDB integer columns fail to convert to `String`, so we try
/// String -> i64 -> f64 -> bool. NULL is `None` whatever the column type.
pub(crate) fn get_column_as_string(row: &duckdb::Row<'_>, idx: usize) -> Option<String> {
    if let Ok(s) = row.get::<_, Option<String>>(idx) {
        return s;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return Some(n.to_string());
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return Some(f.to_string());
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return Some(b.to_string());
    }
    None
}

/// Read every column of a row as text.
pub(crate) fn row_as_strings(row: &duckdb::Row<'_>) -> Row {
    let col_count = row.as_ref().column_count();
    (0..col_count)
        .map(|i| get_column_as_string(row, i))
        .collect()
}

/// Convert a bound parameter to the driver's value type.
pub(crate) fn to_duckdb_value(value: &SqlValue) -> duckdb::types::Value {
    use duckdb::types::Value;
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Boolean(*b),
        SqlValue::Int(n) => Value::BigInt(*n),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
    }
}
