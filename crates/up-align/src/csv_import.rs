//! CSV upsert importer
//!
//! Loads a CSV file with a header row into a table. With a key column every
//! row is first offered to an `UPDATE ... WHERE key = ?`; rows that match
//! nothing are inserted. Both statements are built once per file.

use crate::error::{AlignError, AlignResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use up_core::sql_utils::parse_flag;
use up_db::catalog::{find_column, table_columns};
use up_db::{Database, DbError, SqlType, SqlValue};

/// Outcome of one import
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CsvImportReport {
    /// Rows inserted
    pub inserted: usize,
    /// Rows updated in place
    pub updated: usize,
    /// Rows skipped because their field count did not match the header
    pub skipped: usize,
}

/// Import `path` into `table`, upserting on `key` when given.
pub fn import_csv(
    db: &dyn Database,
    table: &str,
    key: Option<&str>,
    path: &Path,
) -> AlignResult<CsvImportReport> {
    let file = File::open(path).map_err(|e| AlignError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;
    import_csv_reader(db, table, key, file, &path.display().to_string())
}

/// Import CSV text read from `reader`; `name` identifies it in errors.
pub fn import_csv_reader<R: Read>(
    db: &dyn Database,
    table: &str,
    key: Option<&str>,
    reader: R,
    name: &str,
) -> AlignResult<CsvImportReport> {
    let csv_err = |source: csv::Error| AlignError::Csv {
        path: name.to_string(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let names: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| clean_header(h, name))
        .collect::<AlignResult<_>>()?;

    let catalog = table_columns(db, table)?;
    if catalog.is_empty() {
        return Err(DbError::TableNotFound(table.to_string()).into());
    }
    let types: Vec<SqlType> = names
        .iter()
        .map(|n| find_column(&catalog, n).map_or(SqlType::Text, |c| c.sql_type))
        .collect();

    let key_idx = match key.and_then(up_core::sql_utils::non_blank) {
        Some(k) => {
            let idx = names.iter().position(|n| n.eq_ignore_ascii_case(k));
            if idx.is_none() {
                log::warn!("{name}: key column {k} is not in the header; every row is inserted");
            }
            idx
        }
        None => None,
    };

    let insert_sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(","),
        vec!["?"; names.len()].join(",")
    );
    let update_sql = key_idx.map(|k| update_statement(table, &names, k));

    let mut report = CsvImportReport::default();
    for (n, record) in rdr.byte_records().enumerate() {
        let record = record.map_err(csv_err)?;
        if record.len() != names.len() {
            log::warn!(
                "{name}: record {} skipped: expected {} fields, found {}",
                n + 1,
                names.len(),
                record.len()
            );
            report.skipped += 1;
            continue;
        }

        if std::str::from_utf8(record.as_slice()).is_err() {
            log::warn!(
                "{name}: record {} is not valid UTF-8; invalid bytes replaced",
                n + 1
            );
        }
        let values: Vec<SqlValue> = record
            .iter()
            .zip(&types)
            .map(|(raw, sql_type)| field_value(&String::from_utf8_lossy(raw), *sql_type))
            .collect();

        if let (Some(k), Some(sql)) = (key_idx, &update_sql) {
            if values[k] != SqlValue::Null {
                let params = update_params(&values, k);
                if db.execute_with(sql, &params)? > 0 {
                    report.updated += 1;
                    continue;
                }
            }
        }
        db.execute_with(&insert_sql, &values)?;
        report.inserted += 1;
    }

    log::info!(
        "{name} -> {table}: {} inserted, {} updated, {} skipped",
        report.inserted,
        report.updated,
        report.skipped
    );
    Ok(report)
}

/// `UPDATE` of every non-key column, keyed on column `key`
fn update_statement(table: &str, names: &[String], key: usize) -> String {
    let mut assignments: Vec<String> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key)
        .map(|(_, n)| format!("{n}=?"))
        .collect();
    // key-only files still need a statement that reports a match
    if assignments.is_empty() {
        assignments.push(format!("{}=?", names[key]));
    }
    format!(
        "UPDATE {table} SET {} WHERE {}=?",
        assignments.join(","),
        names[key]
    )
}

fn update_params(values: &[SqlValue], key: usize) -> Vec<SqlValue> {
    let mut params: Vec<SqlValue> = values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key)
        .map(|(_, v)| v.clone())
        .collect();
    if params.is_empty() {
        params.push(values[key].clone());
    }
    params.push(values[key].clone());
    params
}

/// Strip matching `"`/`'` around a header name
fn clean_header(raw: &str, name: &str) -> AlignResult<String> {
    let invalid = |message: String| AlignError::CsvFormat {
        path: name.to_string(),
        message,
    };

    let header = raw.trim();
    if header.is_empty() {
        return Err(invalid("empty column name".to_string()));
    }
    for quote in ['"', '\''] {
        if let Some(rest) = header.strip_prefix(quote) {
            return match rest.strip_suffix(quote) {
                Some(inner) if !inner.trim().is_empty() => Ok(inner.trim().to_string()),
                _ => Err(invalid(format!("malformed column name {header}"))),
            };
        }
    }
    Ok(header.to_string())
}

/// Convert one field for binding to a column of `sql_type`.
///
/// Blank fields are NULL; a stray leading/trailing `"` is dropped.
fn field_value(raw: &str, sql_type: SqlType) -> SqlValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return SqlValue::Null;
    }
    let value = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let value = value.strip_suffix('"').unwrap_or(value);

    match sql_type {
        SqlType::Numeric => {
            if let Ok(n) = value.parse::<i64>() {
                SqlValue::Int(n)
            } else if let Ok(f) = value.parse::<f64>() {
                SqlValue::Float(f)
            } else {
                SqlValue::Text(value.to_string())
            }
        }
        SqlType::Boolean => match value.to_ascii_lowercase().as_str() {
            "false" | "0" | "no" | "n" | "f" | "off" => SqlValue::Bool(false),
            v if parse_flag(v) => SqlValue::Bool(true),
            _ => SqlValue::Text(value.to_string()),
        },
        _ => SqlValue::Text(value.to_string()),
    }
}

#[cfg(test)]
#[path = "csv_import_test.rs"]
mod tests;
