//! Tests that drive the updpilot binary against a temporary project

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn updpilot_bin() -> String {
    env!("CARGO_BIN_EXE_updpilot").to_string()
}

const MANIFEST: &str = r#"<updpilot>
  <step major="2024" minor="1">
    <file-sql modify="tables.sql"/>
  </step>
  <step major="2024" minor="2">
    <file-csv modify="codes.csv" table="codes" key="code"/>
  </step>
</updpilot>
"#;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("updpilot.xml"), MANIFEST).unwrap();
    fs::write(
        dir.path().join("updpilot.yml"),
        "database:\n  path: target.duckdb\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("sql/views")).unwrap();
    fs::write(
        dir.path().join("sql/tables.sql"),
        "CREATE TABLE codes (code VARCHAR, label VARCHAR);\n",
    )
    .unwrap();
    fs::write(dir.path().join("sql/codes.csv"), "code,label\nA,Alpha\nB,Beta\n").unwrap();
    fs::write(
        dir.path().join("sql/views/codes-viste.sql"),
        "CREATE OR REPLACE VIEW v_codes AS SELECT code FROM codes;\n",
    )
    .unwrap();
    dir
}

fn updpilot(dir: &Path, args: &[&str]) -> Output {
    Command::new(updpilot_bin())
        .arg("--project-dir")
        .arg(dir)
        .args(args)
        .env_remove("UPDPILOT_DATABASE")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run updpilot {args:?}: {e}"))
}

fn json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or(serde_json::Value::Null)
}

#[test]
fn test_run_then_status() {
    let dir = project();

    let output = updpilot(dir.path(), &["run", "--output", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let state = json(&output);
    assert_eq!(state["updated"], true);
    assert_eq!(state["applied"]["major"], 2024);
    assert_eq!(state["applied"]["minor"], 2);

    let output = updpilot(dir.path(), &["status", "--output", "json"]);
    assert!(output.status.success());
    let status = json(&output);
    assert_eq!(status["installed"]["minor"], 2);
    assert_eq!(status["pending"].as_array().map(Vec::len), Some(0));
    assert_eq!(status["history"].as_array().map(Vec::len), Some(1));

    let output = updpilot(dir.path(), &["run", "--output", "json"]);
    assert!(output.status.success());
    assert_eq!(json(&output)["updated"], false);
}

#[test]
fn test_run_with_installed_override() {
    let dir = project();

    // 2024/1 applied by hand: only the CSV step runs
    let output = updpilot(dir.path(), &["exec-sql", "sql/tables.sql"]);
    assert!(output.status.success());
    let output = updpilot(
        dir.path(),
        &["run", "--installed", "2024/1", "--output", "json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let executed = json(&output)["executed"].as_array().cloned().unwrap_or_default();
    assert_eq!(executed.len(), 1);
}

#[test]
fn test_failed_run_records_completed_steps() {
    let dir = project();
    fs::write(
        dir.path().join("updpilot.xml"),
        MANIFEST.replace(
            "</updpilot>",
            "  <step major=\"2024\" minor=\"3\">\n    <statement>macro_nosuch(codes);</statement>\n  </step>\n</updpilot>",
        ),
    )
    .unwrap();

    let output = updpilot(dir.path(), &["run"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("2024/2"));

    let output = updpilot(dir.path(), &["status", "--output", "json"]);
    assert!(output.status.success());
    let status = json(&output);
    assert_eq!(status["installed"]["minor"], 2);
    assert_eq!(status["pending"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_invalid_force_from_fails() {
    let dir = project();
    let output = updpilot(dir.path(), &["run", "--force-from", "2024/0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_exec_sql_tolerant_reports_failures() {
    let dir = project();
    fs::write(
        dir.path().join("broken.sql"),
        "CREATE TABLE t (id INTEGER);\nINSERT INTO nowhere VALUES (1);\nINSERT INTO t VALUES (1);\n",
    )
    .unwrap();

    let output = updpilot(dir.path(), &["exec-sql", "broken.sql"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 statement(s) executed, 1 failed"), "{stdout}");
    assert!(stdout.contains("nowhere"), "{stdout}");

    let output = updpilot(dir.path(), &["exec-sql", "--strict", "broken.sql"]);
    assert!(!output.status.success());
}

#[test]
fn test_import_csv_and_rebuild_views() {
    let dir = project();
    assert!(updpilot(dir.path(), &["exec-sql", "sql/tables.sql"]).status.success());

    let output = updpilot(
        dir.path(),
        &["import-csv", "sql/codes.csv", "--table", "codes", "--key", "code"],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 inserted"));

    let output = updpilot(
        dir.path(),
        &["import-csv", "sql/codes.csv", "--table", "codes", "--key", "code"],
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 updated"));

    let output = updpilot(dir.path(), &["rebuild-views"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("from 1 file(s)"));
}
