//! Macro subsystem
//!
//! Script statements of the form `macro_<name>(arg1; arg2; ...)` are not
//! sent to the database. They are looked up in a [`MacroRegistry`] and the
//! handler runs the idempotent operation itself. Arguments are separated by
//! `;` because column lists use `,`.

use crate::context::AlignContext;
use crate::error::{AlignError, AlignResult};
use crate::purge::{purge_conflicts, purge_value};
use crate::script::{execute_sql_file, ScriptMode};
use log::Level;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use up_core::sql_utils::{split_list, sql_literal};
use up_db::catalog::{index_exists, is_numeric, table_columns};
use up_db::{ColumnInfo, ErrorClass, SqlType};

/// Label written into required text columns of a zero row
pub const ZERO_LABEL: &str = "Nessuno/indefinito";

/// Handler signature
pub type MacroHandler = fn(&AlignContext<'_>, &MacroCall) -> AlignResult<()>;

fn macro_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*macro_(\w+)\s*\((.*)\)\s*;?\s*$").expect("valid regex")
    })
}

/// A parsed macro invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall {
    /// Lower-cased macro name, without the `macro_` prefix
    pub name: String,
    /// Raw argument text between the parentheses
    pub args: String,
}

impl MacroCall {
    /// Recognize a macro statement; the trailing `;` is optional.
    pub fn parse(sql: &str) -> Option<Self> {
        let caps = macro_regex().captures(sql)?;
        Some(Self {
            name: caps[1].to_ascii_lowercase(),
            args: caps[2].trim().to_string(),
        })
    }

    /// Exactly `expected` non-blank `;`-separated arguments
    pub fn positional(&self, expected: usize) -> AlignResult<Vec<&str>> {
        let args: Vec<&str> = self.args.split(';').map(str::trim).collect();
        if args.len() != expected {
            return Err(AlignError::macro_syntax(
                &self.name,
                &self.args,
                format!(
                    "expected {expected} arguments separated by ';', found {}",
                    args.len()
                ),
            ));
        }
        if let Some(pos) = args.iter().position(|a| a.is_empty()) {
            return Err(AlignError::macro_syntax(
                &self.name,
                &self.args,
                format!("argument {} is empty", pos + 1),
            ));
        }
        Ok(args)
    }
}

/// Name to handler map
pub struct MacroRegistry {
    handlers: HashMap<String, MacroHandler>,
}

impl MacroRegistry {
    /// Registry without any macro
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry holding the built-in macros
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register("createunique", create_unique)
            .register("createuniquepurge", create_unique_purge)
            .register("createforeign", create_foreign)
            .register("createzero", create_zero)
            .register("dropallviews", drop_all_views)
            .register("populateuuid", populate_uuid)
            .register("build", build);
        registry
    }

    /// Add or replace a handler
    pub fn register(&mut self, name: &str, handler: MacroHandler) -> &mut Self {
        self.handlers.insert(name.to_ascii_lowercase(), handler);
        self
    }

    /// Run `sql` as a macro if it is one.
    ///
    /// Returns `Ok(false)` when the text is not a macro call. A macro name
    /// with no handler is an error.
    pub fn try_execute(&self, ctx: &AlignContext<'_>, sql: &str) -> AlignResult<bool> {
        let Some(call) = MacroCall::parse(sql) else {
            return Ok(false);
        };
        let handler = self
            .handlers
            .get(&call.name)
            .ok_or_else(|| AlignError::UnknownMacro {
                name: call.name.clone(),
            })?;
        log::debug!("macro_{}({})", call.name, call.args);
        handler(ctx, &call)?;
        Ok(true)
    }
}

impl Default for MacroRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Shared registry of built-in macros
pub fn builtin_registry() -> &'static MacroRegistry {
    static REGISTRY: OnceLock<MacroRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MacroRegistry::with_builtins)
}

/// `createunique(table; index; col1,col2,...)`
fn create_unique(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    let args = call.positional(3)?;
    let (table, index, columns) = (args[0], args[1], args[2]);

    if index_exists(ctx.db, table, index)? {
        log::debug!("Index {index} already exists; macro ignored");
        return Ok(());
    }

    let sql = ctx.dialect.add_unique_sql(table, index, columns);
    log::trace!("{sql}");
    match ctx.db.execute(&sql) {
        Ok(_) => {
            log::info!("Created unique constraint {index} on {table}({columns})");
            Ok(())
        }
        Err(e) => match ctx.dialect.classify(&e) {
            ErrorClass::AlreadyExists => {
                log::debug!("Index {index} already exists; macro ignored");
                Ok(())
            }
            _ => Err(e.into()),
        },
    }
}

/// `createuniquepurge(table; pk; index; col1,col2,...)`
///
/// Purges duplicates first, then retries the constraint for every duplicate
/// the database still reports. Each retry must null at least one row.
fn create_unique_purge(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    let args = call.positional(4)?;
    let (table, pk, index, columns) = (args[0], args[1], args[2], args[3]);

    if index_exists(ctx.db, table, index)? {
        log::debug!("Index {index} already exists; macro ignored");
        return Ok(());
    }

    purge_conflicts(ctx.db, table, pk, columns)?;

    let sql = ctx.dialect.add_unique_sql(table, index, columns);
    loop {
        log::trace!("{sql}");
        let err = match ctx.db.execute(&sql) {
            Ok(_) => {
                log::info!("Created unique constraint {index} on {table}({columns})");
                return Ok(());
            }
            Err(e) => e,
        };

        match ctx.dialect.classify(&err) {
            ErrorClass::AlreadyExists => {
                log::debug!("Index {index} already exists; macro ignored");
                return Ok(());
            }
            ErrorClass::DuplicateKey {
                columns: dup_columns,
                values,
            } => {
                let nulled = purge_value(ctx.db, table, pk, &dup_columns, &values)?;
                if nulled == 0 {
                    return Err(AlignError::DuplicateNotResolved {
                        table: table.to_string(),
                        index: index.to_string(),
                        columns: dup_columns,
                        values,
                    });
                }
                log::info!("Removed value ({values}) from {table}({dup_columns})");
            }
            ErrorClass::DuplicateData => {
                let report = purge_conflicts(ctx.db, table, pk, columns)?;
                if report.nulled == 0 {
                    return Err(AlignError::DuplicateNotResolved {
                        table: table.to_string(),
                        index: index.to_string(),
                        columns: columns.to_string(),
                        values: "unreported".to_string(),
                    });
                }
            }
            ErrorClass::Other => return Err(err.into()),
        }
    }
}

/// `createforeign(table; index; cols; foreign_table; foreign_cols)`
///
/// Best effort: failures are logged and the run continues.
fn create_foreign(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    let args = call.positional(5)?;
    let (table, index, columns, foreign_table, foreign_columns) =
        (args[0], args[1], args[2], args[3], args[4]);

    if index_exists(ctx.db, table, index)? {
        log::debug!("Index {index} already exists; macro ignored");
        return Ok(());
    }

    let local = split_list(columns);
    let assignments: Vec<String> = local.iter().map(|c| format!("{c} = NULL")).collect();
    let tuple = if local.len() == 1 {
        local[0].to_string()
    } else {
        format!("({})", local.join(", "))
    };
    let orphans = format!(
        "UPDATE {table} SET {} WHERE {tuple} NOT IN (SELECT {foreign_columns} FROM {foreign_table})",
        assignments.join(", ")
    );
    let fk = ctx
        .dialect
        .add_foreign_key_sql(table, index, columns, foreign_table, foreign_columns);

    for sql in [&orphans, &fk] {
        log::trace!("{sql}");
        if let Err(e) = ctx.db.execute(sql) {
            match ctx.dialect.classify(&e) {
                ErrorClass::AlreadyExists => log::debug!("Foreign key {index} already exists"),
                _ => log::warn!("macro_createforeign {index}: {e}"),
            }
            return Ok(());
        }
    }
    log::info!("Created foreign key {index} on {table}({columns})");
    Ok(())
}

/// `INSERT` for a sentinel row of `table`; `None` when no column is known.
pub fn zero_row_sql(table: &str, columns: &[ColumnInfo]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let values: Vec<String> = columns.iter().map(zero_value).collect();
    Some(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(","),
        values.join(",")
    ))
}

fn zero_value(column: &ColumnInfo) -> String {
    let required = !column.nullable;
    match column.sql_type {
        SqlType::Numeric if column.name.eq_ignore_ascii_case("stato_rec") => "10".to_string(),
        SqlType::Numeric => "0".to_string(),
        SqlType::Boolean => "false".to_string(),
        SqlType::Timestamp if required => "current_timestamp".to_string(),
        SqlType::Date if required => "current_date".to_string(),
        SqlType::Timestamp | SqlType::Date => "NULL".to_string(),
        _ if required => {
            let fits = column.size.map_or(true, |s| s as usize > ZERO_LABEL.len());
            if fits {
                sql_literal(ZERO_LABEL, false)
            } else {
                "'0'".to_string()
            }
        }
        _ => "NULL".to_string(),
    }
}

/// `createzero(table)`
fn create_zero(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    let args = call.positional(1)?;
    let table = args[0];

    let columns = table_columns(ctx.db, table)?;
    let Some(sql) = zero_row_sql(table, &columns) else {
        log::warn!("macro_createzero: table {table} not found");
        return Ok(());
    };
    log::trace!("{sql}");
    match ctx.db.execute(&sql) {
        Ok(_) => log::info!("Inserted zero row into {table}"),
        Err(e) => log::debug!("macro_createzero {table}: {e}"),
    }
    Ok(())
}

/// Flags accepted by `dropallviews`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropViewOptions {
    /// Report every drop at info level
    pub verbose: bool,
    /// Log each statement
    pub show_sql: bool,
}

impl DropViewOptions {
    /// Parse `verbose`, `showsql` (bare or `=true`) separated by space, `,` or `;`
    pub fn parse(args: &str) -> Self {
        let mut options = Self::default();
        for token in args.split([' ', ',', ';']).filter(|t| !t.is_empty()) {
            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, up_core::sql_utils::parse_flag(v)),
                None => (token, true),
            };
            match key.to_ascii_lowercase().as_str() {
                "verbose" => options.verbose = value,
                "showsql" => options.show_sql = value,
                other => log::debug!("macro_dropallviews: unknown option '{other}'"),
            }
        }
        options
    }
}

/// `dropallviews(options)`
fn drop_all_views(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    let options = DropViewOptions::parse(&call.args);
    let level = if options.verbose {
        Level::Info
    } else {
        Level::Debug
    };

    let views = ctx.db.views()?;
    log::info!("Dropping {} views", views.len());

    for view in &views {
        let sql = ctx.dialect.drop_view_sql(view);
        if options.show_sql {
            log::info!("{sql}");
        }
        match ctx.db.execute(&sql) {
            Ok(_) => log::log!(level, "Dropped view {view}"),
            Err(e) => log::log!(level, "Could not drop view {view}: {e}"),
        }
    }
    Ok(())
}

/// `populateuuid(table; pk; column)`: one UPDATE per NULL row
fn populate_uuid(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    let args = call.positional(3)?;
    let (table, pk, column) = (args[0], args[1], args[2]);

    let pk_numeric = is_numeric(ctx.db, table, pk)?;
    let keys: Vec<String> = ctx
        .db
        .query(&format!(
            "SELECT CAST({pk} AS VARCHAR) FROM {table} WHERE {column} IS NULL"
        ))?
        .into_iter()
        .filter_map(|mut row| row.swap_remove(0))
        .collect();

    for key in &keys {
        let sql = format!(
            "UPDATE {table} SET {column} = '{}' WHERE {pk} = {}",
            uuid::Uuid::new_v4(),
            sql_literal(key, pk_numeric)
        );
        log::trace!("{sql}");
        ctx.db.execute(&sql)?;
    }
    log::info!("Populated {} uuid value(s) in {table}.{column}", keys.len());
    Ok(())
}

/// `build()`: run every configured build script, tolerating errors
fn build(ctx: &AlignContext<'_>, _call: &MacroCall) -> AlignResult<()> {
    let scripts = ctx.config.build_scripts_absolute(ctx.root());
    if scripts.is_empty() {
        log::error!("macro_build: no build scripts configured");
        return Ok(());
    }
    for script in &scripts {
        if let Err(e) = execute_sql_file(ctx, script, ScriptMode::Tolerant) {
            log::error!("macro_build: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "macros_test.rs"]
mod tests;
