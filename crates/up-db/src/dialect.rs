//! Per-adapter SQL dialects
//!
//! A dialect renders the handful of DDL statements the macros need and
//! classifies driver errors so the engine can decide between retry, no-op
//! and abort without inspecting message text itself.
//!
//! Classification is message-text based. Driver messages are vendor and
//! locale specific; every adapter owns its own patterns.

use crate::error::DbError;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Outcome of classifying a driver error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// The object being created already exists
    AlreadyExists,
    /// A unique constraint failed on the reported column/value lists
    DuplicateKey { columns: String, values: String },
    /// A unique index could not be built over duplicates; no value reported
    DuplicateData,
    /// Anything else
    Other,
}

/// Trait for adapter-specific SQL
pub trait Dialect: Send + Sync {
    /// Adapter name
    fn name(&self) -> &'static str;

    /// Statement adding a unique constraint `index` on `columns` of `table`
    fn add_unique_sql(&self, table: &str, index: &str, columns: &str) -> String {
        format!("ALTER TABLE {table} ADD CONSTRAINT {index} UNIQUE({columns})")
    }

    /// Statement adding a foreign key
    fn add_foreign_key_sql(
        &self,
        table: &str,
        index: &str,
        columns: &str,
        foreign_table: &str,
        foreign_columns: &str,
    ) -> String {
        format!(
            "ALTER TABLE {table} ADD CONSTRAINT {index} FOREIGN KEY ({columns}) REFERENCES {foreign_table} ({foreign_columns})"
        )
    }

    /// Statement dropping a view
    fn drop_view_sql(&self, view: &str) -> String {
        format!("DROP VIEW {view}")
    }

    /// Classify a driver error
    fn classify(&self, err: &DbError) -> ErrorClass;

    /// Adjust a script statement before it is sent to the driver
    fn rewrite_statement<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(sql)
    }
}

fn generic_already_exists() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)already exists").expect("valid regex"))
}

/// PostgreSQL
pub struct PostgresDialect;

fn pg_already_exists() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)relation .+ already exists").expect("valid regex"))
}

fn pg_duplicated() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Key \((.+)\)=\((.*)\) is duplicated").expect("valid regex"))
}

fn pg_schema_fk() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)ALTER TABLE (.+) +ADD CONSTRAINT +.+\.(.+) +FOREIGN KEY +(.+)")
            .expect("valid regex")
    })
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn drop_view_sql(&self, view: &str) -> String {
        format!("DROP VIEW {view} CASCADE")
    }

    fn classify(&self, err: &DbError) -> ErrorClass {
        let msg = err.message();
        if pg_already_exists().is_match(msg) {
            return ErrorClass::AlreadyExists;
        }
        if let Some(caps) = pg_duplicated().captures(msg) {
            return ErrorClass::DuplicateKey {
                columns: caps[1].to_string(),
                values: caps[2].to_string(),
            };
        }
        ErrorClass::Other
    }

    /// Generated schema scripts qualify foreign key names with the schema
    /// (`ADD CONSTRAINT dvm.t_fk_1`), which PostgreSQL rejects; the
    /// constraint lives in the table's schema, so the prefix is dropped.
    fn rewrite_statement<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        if !sql.trim_start().to_ascii_uppercase().starts_with("ALTER") {
            return Cow::Borrowed(sql);
        }
        let flat = sql.replace("\r\n", " ").replace('\n', " ");
        match pg_schema_fk().captures(&flat) {
            Some(caps) => Cow::Owned(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY {}",
                &caps[1], &caps[2], &caps[3]
            )),
            None => Cow::Borrowed(sql),
        }
    }
}

/// DuckDB
///
/// DuckDB has no `ADD CONSTRAINT`; unique constraints are unique indexes.
pub struct DuckDbDialect;

fn duck_duplicate() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)Duplicate key "(.+?): (.*)" violates"#).expect("valid regex")
    })
}

/// Raised by `CREATE UNIQUE INDEX` over existing duplicates
fn duck_duplicate_data() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Data contains duplicates on indexed column").expect("valid regex")
    })
}

impl Dialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn add_unique_sql(&self, table: &str, index: &str, columns: &str) -> String {
        format!("CREATE UNIQUE INDEX {index} ON {table} ({columns})")
    }

    fn classify(&self, err: &DbError) -> ErrorClass {
        let msg = err.message();
        if generic_already_exists().is_match(msg) {
            return ErrorClass::AlreadyExists;
        }
        if let Some(caps) = duck_duplicate().captures(msg) {
            return ErrorClass::DuplicateKey {
                columns: caps[1].to_string(),
                values: caps[2].to_string(),
            };
        }
        if duck_duplicate_data().is_match(msg) {
            return ErrorClass::DuplicateData;
        }
        ErrorClass::Other
    }
}

/// Any other adapter: standard DDL, only "already exists" is recognised
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn classify(&self, err: &DbError) -> ErrorClass {
        if generic_already_exists().is_match(err.message()) {
            ErrorClass::AlreadyExists
        } else {
            ErrorClass::Other
        }
    }
}

/// Dialect for an adapter name
pub fn dialect_for(adapter: &str) -> Box<dyn Dialect> {
    match adapter.trim().to_ascii_lowercase().as_str() {
        "postgresql" | "postgres" => Box::new(PostgresDialect),
        "duckdb" => Box::new(DuckDbDialect),
        _ => Box::new(GenericDialect),
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
