//! Exec-sql command implementation

use anyhow::{Context, Result};
use up_align::{execute_sql_file, AlignContext, ScriptMode};

use crate::cli::{ExecSqlArgs, GlobalArgs};
use crate::commands::common::{ExitCode, Project, SpinnerProgress};

/// Execute the exec-sql command
pub(crate) fn execute(args: &ExecSqlArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let path = project.resolve(&args.file);
    let mode = if args.strict {
        ScriptMode::Strict
    } else {
        ScriptMode::Tolerant
    };

    let db = project.open_database()?;
    let dialect = project.dialect();
    let spinner = SpinnerProgress::new();
    let ctx = AlignContext::new(&db, dialect.as_ref(), &project.config, project.root.clone())
        .with_progress(&spinner);

    let result = execute_sql_file(&ctx, &path, mode);
    spinner.finish();
    let report = result.with_context(|| format!("Failed to execute {}", path.display()))?;

    println!(
        "{}: {} statement(s) executed, {} failed",
        path.display(),
        report.executed,
        report.failed.len()
    );
    for (table, failures) in report.failures_by_table() {
        println!("  ✗ {table}: {failures}");
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(ExitCode(1).into())
    }
}
