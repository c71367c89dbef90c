//! Duplicate resolver
//!
//! Makes a column combination safe for a unique constraint by nulling the
//! target columns on every row of a duplicate group except the one with the
//! lowest primary key (the survivor).

use crate::error::{AlignError, AlignResult};
use up_core::sql_utils::{split_list, sql_literal};
use up_db::catalog::{find_column, table_columns};
use up_db::{Database, SqlType};

/// Largest conflict set nulled by one `UPDATE ... IN (...)`
pub const BATCH_LIMIT: usize = 50;

/// Outcome of a purge
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Duplicate groups found
    pub groups: usize,
    /// Rows whose target columns were nulled
    pub nulled: usize,
}

/// Remove every duplicate of `columns` (comma list) in `table`.
///
/// Empty strings in text columns are normalized to NULL first, then each
/// duplicate group is resolved with the lowest `pk` as survivor.
pub fn purge_conflicts(
    db: &dyn Database,
    table: &str,
    pk: &str,
    columns: &str,
) -> AlignResult<PurgeReport> {
    let target = Target::resolve(db, table, pk, columns)?;
    target.normalize_empty_strings(db)?;

    let select: Vec<String> = target
        .columns
        .iter()
        .map(|c| format!("CAST({c} AS VARCHAR)"))
        .collect();
    let not_null: String = target
        .columns
        .iter()
        .map(|c| format!(" AND {c} IS NOT NULL"))
        .collect();
    let sql = format!(
        "SELECT {}, COUNT(*) FROM {table} GROUP BY {} HAVING COUNT(*) > 1{not_null}",
        select.join(", "),
        target.columns.join(", ")
    );
    log::trace!("{sql}");

    let mut report = PurgeReport::default();
    for row in db.query(&sql)? {
        let values: Option<Vec<String>> = row
            .into_iter()
            .take(target.columns.len())
            .collect::<Option<Vec<String>>>();
        let Some(values) = values else {
            continue;
        };
        report.groups += 1;
        report.nulled += target.purge_group(db, &values)?;
    }

    if report.groups > 0 {
        log::info!(
            "Purged {} duplicate group(s) on {table}({columns}): {} row(s) nulled",
            report.groups,
            report.nulled
        );
    }
    Ok(report)
}

/// Resolve one duplicate group reported by the database.
///
/// `columns` and `values` are the comma lists found in the driver message.
/// Returns the number of rows nulled.
pub fn purge_value(
    db: &dyn Database,
    table: &str,
    pk: &str,
    columns: &str,
    values: &str,
) -> AlignResult<usize> {
    let target = Target::resolve(db, table, pk, columns)?;
    let values: Vec<String> = values.split(',').map(|v| v.trim().to_string()).collect();
    if values.len() != target.columns.len() {
        return Err(AlignError::DuplicateMismatch {
            table: table.to_string(),
            columns: columns.to_string(),
            values: values.join(","),
        });
    }
    target.purge_group(db, &values)
}

/// Table, key and target columns with their literal styles
struct Target<'t> {
    table: &'t str,
    pk: &'t str,
    columns: Vec<&'t str>,
    numeric: Vec<bool>,
    textual: Vec<bool>,
    pk_numeric: bool,
}

impl<'t> Target<'t> {
    fn resolve(
        db: &dyn Database,
        table: &'t str,
        pk: &'t str,
        columns: &'t str,
    ) -> AlignResult<Self> {
        let columns = split_list(columns);
        let catalog = table_columns(db, table)?;
        let kind = |name: &str| find_column(&catalog, name).map(|c| c.sql_type);

        Ok(Self {
            table,
            pk: pk.trim(),
            numeric: columns
                .iter()
                .map(|c| kind(c).is_some_and(SqlType::is_numeric))
                .collect(),
            textual: columns
                .iter()
                .map(|c| matches!(kind(c), None | Some(SqlType::Text)))
                .collect(),
            pk_numeric: kind(pk.trim()).is_some_and(SqlType::is_numeric),
            columns,
        })
    }

    /// `''` and NULL are distinct under a unique constraint on some engines.
    fn normalize_empty_strings(&self, db: &dyn Database) -> AlignResult<()> {
        for (column, textual) in self.columns.iter().zip(&self.textual) {
            if !textual {
                continue;
            }
            let sql = format!(
                "UPDATE {} SET {column} = NULL WHERE {column} = ''",
                self.table
            );
            log::trace!("{sql}");
            db.execute(&sql)?;
        }
        Ok(())
    }

    fn purge_group(&self, db: &dyn Database, values: &[String]) -> AlignResult<usize> {
        let filter: Vec<String> = self
            .columns
            .iter()
            .zip(values)
            .zip(&self.numeric)
            .map(|((column, value), numeric)| {
                format!("{column} = {}", sql_literal(value, *numeric))
            })
            .collect();
        let sql = format!(
            "SELECT CAST({pk} AS VARCHAR) FROM {table} WHERE {} ORDER BY {pk}",
            filter.join(" AND "),
            pk = self.pk,
            table = self.table
        );
        log::trace!("{sql}");

        let keys: Vec<String> = db
            .query(&sql)?
            .into_iter()
            .filter_map(|mut row| row.swap_remove(0))
            .collect();
        if keys.len() < 2 {
            return Ok(0);
        }
        log::debug!(
            "Duplicate ({})=({}) on {}: keeping {} = {}, nulling {} row(s)",
            self.columns.join(","),
            values.join(","),
            self.table,
            self.pk,
            keys[0],
            keys.len() - 1
        );
        self.null_keys(db, &keys[1..])
    }

    /// Null the target columns for `keys`, halving the set while it exceeds
    /// [`BATCH_LIMIT`].
    fn null_keys(&self, db: &dyn Database, keys: &[String]) -> AlignResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        if keys.len() > BATCH_LIMIT {
            let (left, right) = keys.split_at(keys.len() / 2);
            return Ok(self.null_keys(db, left)? + self.null_keys(db, right)?);
        }

        let assignments: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{c} = NULL"))
            .collect();
        let in_list: Vec<String> = keys
            .iter()
            .map(|k| sql_literal(k, self.pk_numeric))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} IN ({})",
            self.table,
            assignments.join(", "),
            self.pk,
            in_list.join(", ")
        );
        log::trace!("{sql}");
        Ok(db.execute(&sql)?)
    }
}

#[cfg(test)]
#[path = "purge_test.rs"]
mod tests;
