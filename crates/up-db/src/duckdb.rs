//! DuckDB database backend implementation

use crate::catalog::{ColumnInfo, SqlType};
use crate::error::{DbError, DbResult};
use crate::row_helpers::{row_as_strings, to_duckdb_value};
use crate::traits::{Database, Row, SqlValue};
use duckdb::Connection;
use std::path::Path;

/// DuckDB database backend
///
/// Single-threaded: the engine never shares a connection, so no `Mutex`.
pub struct DuckDbBackend {
    conn: Connection,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a catalog query taking `(schema?, name)` parameters.
    ///
    /// Unqualified names resolve against `current_schema()`.
    fn catalog_rows<T, F>(&self, sql_template: &str, table: &str, map: F) -> DbResult<Vec<T>>
    where
        F: Fn(&duckdb::Row<'_>) -> duckdb::Result<T>,
    {
        let (schema, name) = up_core::sql_utils::split_qualified_name(table);
        let schema_cond = if schema.is_some() {
            "?"
        } else {
            "current_schema()"
        };
        let sql = sql_template.replace("{schema}", schema_cond);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DbError::CatalogError(e.to_string()))?;
        let mut args: Vec<String> = Vec::with_capacity(2);
        if let Some(s) = schema {
            args.push(s.to_string());
        }
        args.push(name.to_string());

        let rows = stmt
            .query_map(duckdb::params_from_iter(args), |row| map(row))
            .map_err(|e| DbError::CatalogError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::CatalogError(e.to_string()))?;
        Ok(rows)
    }
}

const COLUMNS_SQL: &str = "SELECT column_name, data_type, is_nullable, character_maximum_length \
     FROM information_schema.columns \
     WHERE table_schema = {schema} AND table_name = ? \
     ORDER BY ordinal_position";

const INDEXES_SQL: &str = "SELECT index_name FROM duckdb_indexes() \
     WHERE schema_name = {schema} AND table_name = ?";

const VIEWS_SQL: &str = "SELECT schema_name, view_name FROM duckdb_views() \
     WHERE NOT internal AND NOT temporary \
     ORDER BY schema_name, view_name";

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        Ok(self.conn.execute(sql, [])?)
    }

    fn execute_with(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let values: Vec<duckdb::types::Value> = params.iter().map(to_duckdb_value).collect();
        Ok(stmt.execute(duckdb::params_from_iter(values))?)
    }

    fn query(&self, sql: &str) -> DbResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| Ok(row_as_strings(row)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        self.catalog_rows(COLUMNS_SQL, table, |row| {
            let name: String = row.get(0)?;
            let type_name: String = row.get(1)?;
            let nullable: String = row.get(2)?;
            let size: Option<i64> = row.get(3)?;
            Ok(ColumnInfo {
                sql_type: SqlType::from_type_name(&type_name),
                name,
                type_name,
                nullable: nullable.eq_ignore_ascii_case("YES"),
                size: size.and_then(|s| u32::try_from(s).ok()),
            })
        })
    }

    fn index_names(&self, table: &str) -> DbResult<Vec<String>> {
        self.catalog_rows(INDEXES_SQL, table, |row| row.get::<_, String>(0))
    }

    fn views(&self) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(VIEWS_SQL)
            .map_err(|e| DbError::CatalogError(e.to_string()))?;
        let views = stmt
            .query_map([], |row| {
                let schema: Option<String> = row.get(0)?;
                let view: String = row.get(1)?;
                Ok(match schema {
                    Some(s) if !s.is_empty() => format!("{s}.{view}"),
                    _ => view,
                })
            })
            .map_err(|e| DbError::CatalogError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::CatalogError(e.to_string()))?;
        Ok(views)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
