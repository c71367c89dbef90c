use super::*;
use crate::test_support::RecordingDb;
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use up_core::AlignConfig;
use up_db::{Database, DbError, DbResult, Dialect, DuckDbDialect, Row, SqlValue};

fn run(db: &RecordingDb, sql: &str) -> AlignResult<bool> {
    let config = AlignConfig::default();
    let ctx = AlignContext::new(db, &DuckDbDialect, &config, ".");
    builtin_registry().try_execute(&ctx, sql)
}

fn count(db: &RecordingDb, sql: &str) -> String {
    db.column(sql).remove(0).unwrap()
}

#[test]
fn test_parse_macro_call() {
    let call = MacroCall::parse("macro_CreateUnique(T; UX_T; A, B);").unwrap();
    assert_eq!(call.name, "createunique");
    assert_eq!(call.args, "T; UX_T; A, B");

    let call = MacroCall::parse("  macro_createzero(\n TURBINE_USER\n )").unwrap();
    assert_eq!(call.name, "createzero");
    assert_eq!(call.args, "TURBINE_USER");

    assert!(MacroCall::parse("CREATE TABLE macro_x (id INT)").is_none());
    assert!(MacroCall::parse("SELECT 1").is_none());
}

#[test]
fn test_positional_arguments() {
    let call = MacroCall::parse("macro_createunique( t ;ux; a,b )").unwrap();
    assert_eq!(call.positional(3).unwrap(), vec!["t", "ux", "a,b"]);

    let err = call.positional(4).unwrap_err();
    assert!(matches!(err, AlignError::MacroSyntax { .. }));

    let call = MacroCall::parse("macro_createunique(t; ; a)").unwrap();
    let err = call.positional(3).unwrap_err();
    assert!(err.to_string().contains("argument 2 is empty"));
}

#[test]
fn test_unknown_macro_is_an_error() {
    let db = RecordingDb::new("");
    let err = run(&db, "macro_frobnicate(x)").unwrap_err();
    assert!(matches!(err, AlignError::UnknownMacro { ref name } if name == "frobnicate"));
}

#[test]
fn test_non_macro_is_not_handled() {
    let db = RecordingDb::new("");
    assert!(!run(&db, "CREATE TABLE t (id INTEGER)").unwrap());
    assert!(db.executed().is_empty());
}

fn mark(ctx: &AlignContext<'_>, call: &MacroCall) -> AlignResult<()> {
    ctx.db.execute(&format!("CREATE TABLE {} (id INTEGER)", call.args))?;
    Ok(())
}

#[test]
fn test_custom_registry() {
    let db = RecordingDb::new("");
    let config = AlignConfig::default();
    let mut registry = MacroRegistry::empty();
    registry.register("Mark", mark);

    let ctx = AlignContext::new(&db, &DuckDbDialect, &config, ".").with_macros(&registry);
    assert!(registry.try_execute(&ctx, "macro_mark(marked);").unwrap());
    assert_eq!(db.executed(), vec!["CREATE TABLE marked (id INTEGER)".to_string()]);
}

#[test]
fn test_builtin_names() {
    let mut names: Vec<&str> = builtin_registry()
        .handlers
        .keys()
        .map(String::as_str)
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "build",
            "createforeign",
            "createunique",
            "createuniquepurge",
            "createzero",
            "dropallviews",
            "populateuuid"
        ]
    );
}

#[test]
fn test_create_unique_is_idempotent() {
    let db = RecordingDb::new("CREATE TABLE t (id INTEGER, code VARCHAR)");
    assert!(run(&db, "macro_createunique(t; ux_t_code; code)").unwrap());
    db.clear();
    assert!(run(&db, "macro_createunique(t; UX_T_CODE; code)").unwrap());
    assert!(db.executed().is_empty());
    assert_eq!(db.index_names("t").unwrap(), vec!["ux_t_code".to_string()]);
}

#[test]
fn test_create_unique_fails_on_duplicates() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER, code VARCHAR);
         INSERT INTO t VALUES (1, 'A'), (2, 'A');",
    );
    let err = run(&db, "macro_createunique(t; ux_t_code; code)").unwrap_err();
    assert!(matches!(err, AlignError::Db(_)));
}

#[test]
fn test_create_unique_purge_resolves_duplicates() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER, code VARCHAR);
         INSERT INTO t VALUES (1, 'A'), (2, 'A'), (3, 'B');",
    );
    assert!(run(&db, "macro_createuniquepurge(t; id; ux_t_1; code);").unwrap());
    assert_eq!(
        db.column("SELECT code FROM t ORDER BY id"),
        vec![Some("A".to_string()), None, Some("B".to_string())]
    );
    assert_eq!(db.index_names("t").unwrap(), vec!["ux_t_1".to_string()]);
}

#[test]
fn test_create_unique_purge_skips_existing_index() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER, code VARCHAR);
         CREATE INDEX ux_t_1 ON t (code);
         INSERT INTO t VALUES (1, 'A'), (2, 'A');",
    );
    assert!(run(&db, "macro_createuniquepurge(t; id; ux_t_1; code)").unwrap());
    assert!(db.executed().is_empty());
    assert_eq!(count(&db, "SELECT CAST(COUNT(code) AS VARCHAR) FROM t"), "2");
}

/// Reports every failure as a duplicate of `code = 'A'`; the first
/// constraint attempt targets a missing table so that it fails.
struct StubbornDialect {
    attempts: AtomicUsize,
}

impl Dialect for StubbornDialect {
    fn name(&self) -> &'static str {
        "stubborn"
    }

    fn add_unique_sql(&self, _table: &str, index: &str, columns: &str) -> String {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        format!("CREATE UNIQUE INDEX {index} ON no_such_table ({columns})")
    }

    fn classify(&self, _err: &DbError) -> ErrorClass {
        ErrorClass::DuplicateKey {
            columns: "code".to_string(),
            values: "A".to_string(),
        }
    }
}

#[test]
fn test_create_unique_purge_stops_when_duplicate_cannot_be_removed() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER, code VARCHAR);
         INSERT INTO t VALUES (1, 'A'), (2, 'B');",
    );
    let config = AlignConfig::default();
    let dialect = StubbornDialect {
        attempts: AtomicUsize::new(0),
    };
    let ctx = AlignContext::new(&db, &dialect, &config, ".");

    let err = builtin_registry()
        .try_execute(&ctx, "macro_createuniquepurge(t; id; ux_t_1; code)")
        .unwrap_err();
    assert!(matches!(err, AlignError::DuplicateNotResolved { .. }));
    assert_eq!(dialect.attempts.load(Ordering::SeqCst), 1);
}

/// Inserts a row just before the first unique index is built, so the
/// initial purge misses it.
struct LateWriterDb {
    inner: RecordingDb,
    late_row: Cell<Option<&'static str>>,
}

impl Database for LateWriterDb {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        if sql.starts_with("CREATE UNIQUE INDEX") {
            if let Some(insert) = self.late_row.take() {
                self.inner.execute(insert)?;
            }
        }
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

#[test]
fn test_create_unique_purge_retries_after_index_build_fails() {
    let db = LateWriterDb {
        inner: RecordingDb::new(
            "CREATE TABLE t (id INTEGER, code VARCHAR);
             INSERT INTO t VALUES (1, 'A'), (2, 'A'), (3, 'B');",
        ),
        late_row: Cell::new(Some("INSERT INTO t VALUES (4, 'B')")),
    };
    let config = AlignConfig::default();
    let ctx = AlignContext::new(&db, &DuckDbDialect, &config, ".");

    assert!(builtin_registry()
        .try_execute(&ctx, "macro_createuniquepurge(t; id; ux_t_1; code)")
        .unwrap());

    assert_eq!(
        db.inner.column("SELECT code FROM t ORDER BY id"),
        vec![
            Some("A".to_string()),
            None,
            Some("B".to_string()),
            None
        ]
    );
    let create_attempts = db
        .inner
        .executed()
        .iter()
        .filter(|sql| sql.starts_with("CREATE UNIQUE INDEX"))
        .count();
    assert_eq!(create_attempts, 2);
    assert_eq!(db.inner.index_names("t").unwrap(), vec!["ux_t_1".to_string()]);
}

#[test]
fn test_create_foreign_nulls_orphans_and_tolerates_failure() {
    let db = RecordingDb::new(
        "CREATE TABLE parent (id INTEGER PRIMARY KEY);
         CREATE TABLE child (id INTEGER, parent_id INTEGER);
         INSERT INTO parent VALUES (1), (2);
         INSERT INTO child VALUES (10, 1), (11, 99), (12, 2);",
    );
    assert!(run(
        &db,
        "macro_createforeign(child; child_fk_1; parent_id; parent; id)"
    )
    .unwrap());
    assert_eq!(
        db.column("SELECT CAST(parent_id AS VARCHAR) FROM child ORDER BY id"),
        vec![Some("1".to_string()), None, Some("2".to_string())]
    );
}

#[test]
fn test_zero_row_values() {
    let col = |name: &str, sql_type: SqlType, nullable: bool, size: Option<u32>| ColumnInfo {
        name: name.to_string(),
        type_name: String::new(),
        sql_type,
        nullable,
        size,
    };
    let sql = zero_row_sql(
        "s.t",
        &[
            col("id", SqlType::Numeric, false, None),
            col("STATO_REC", SqlType::Numeric, true, None),
            col("created", SqlType::Timestamp, false, None),
            col("changed", SqlType::Timestamp, true, None),
            col("active", SqlType::Boolean, true, None),
            col("descr", SqlType::Text, false, Some(50)),
            col("code", SqlType::Text, false, Some(5)),
            col("note", SqlType::Text, true, Some(50)),
        ],
    )
    .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO s.t (id,STATO_REC,created,changed,active,descr,code,note) \
         VALUES (0,10,current_timestamp,NULL,false,'Nessuno/indefinito','0',NULL)"
    );
    assert!(zero_row_sql("t", &[]).is_none());
}

#[test]
fn test_create_zero_inserts_once() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, stato_rec INTEGER, descr VARCHAR NOT NULL, note VARCHAR)",
    );
    assert!(run(&db, "macro_createzero(t)").unwrap());
    assert!(run(&db, "macro_createzero(t)").unwrap());
    assert_eq!(count(&db, "SELECT CAST(COUNT(*) AS VARCHAR) FROM t"), "1");
    assert_eq!(count(&db, "SELECT CAST(stato_rec AS VARCHAR) FROM t"), "10");
    assert_eq!(count(&db, "SELECT descr FROM t"), ZERO_LABEL);
}

#[test]
fn test_create_zero_unknown_table_is_tolerated() {
    let db = RecordingDb::new("");
    assert!(run(&db, "macro_createzero(nope)").unwrap());
    assert!(db.executed().is_empty());
}

#[test]
fn test_drop_view_options() {
    assert_eq!(DropViewOptions::parse(""), DropViewOptions::default());
    assert_eq!(
        DropViewOptions::parse("verbose, showsql=true"),
        DropViewOptions {
            verbose: true,
            show_sql: true
        }
    );
    assert_eq!(
        DropViewOptions::parse("verbose=false;showsql"),
        DropViewOptions {
            verbose: false,
            show_sql: true
        }
    );
}

#[test]
fn test_drop_all_views() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER);
         CREATE VIEW v1 AS SELECT * FROM t;
         CREATE VIEW v2 AS SELECT id FROM t;",
    );
    assert!(run(&db, "macro_dropallviews(verbose)").unwrap());
    assert!(db.views().unwrap().is_empty());
    assert_eq!(db.executed().len(), 2);
}

#[test]
fn test_populate_uuid_fills_nulls_only() {
    let db = RecordingDb::new(
        "CREATE TABLE t (id INTEGER, uid VARCHAR);
         INSERT INTO t VALUES (1, NULL), (2, 'keep-me'), (3, NULL);",
    );
    assert!(run(&db, "macro_populateuuid(t; id; uid)").unwrap());
    let values: Vec<String> = db
        .column("SELECT uid FROM t ORDER BY id")
        .into_iter()
        .map(Option::unwrap)
        .collect();
    assert_eq!(values[1], "keep-me");
    assert!(uuid::Uuid::parse_str(&values[0]).is_ok());
    assert!(uuid::Uuid::parse_str(&values[2]).is_ok());
    assert_ne!(values[0], values[2]);
    assert_eq!(db.executed().len(), 2);
}

#[test]
fn test_build_without_scripts_does_nothing() {
    let db = RecordingDb::new("");
    assert!(run(&db, "macro_build()").unwrap());
    assert!(db.executed().is_empty());
}

#[test]
fn test_build_runs_configured_scripts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("build.sql"),
        "CREATE TABLE built (id INTEGER);\nCREATE TABLE built (id INTEGER);\n",
    )
    .unwrap();
    let config = AlignConfig {
        build_scripts: vec!["build.sql".to_string()],
        ..AlignConfig::default()
    };
    let db = RecordingDb::new("");
    let ctx = AlignContext::new(&db, &DuckDbDialect, &config, dir.path());

    assert!(builtin_registry().try_execute(&ctx, "macro_build()").unwrap());
    assert_eq!(db.columns("built").unwrap().len(), 1);
}
