//! Action executor: runs one manifest item

use crate::context::AlignContext;
use crate::csv_import::import_csv;
use crate::error::AlignResult;
use crate::script::{execute_sql_file, execute_sql_text, ScriptMode};
use std::path::PathBuf;
use std::process::{Command, Output};
use up_core::{Item, ItemKind, OsFamily};
use up_db::with_transaction;

/// Execute `item`.
///
/// When transactions are honoured and the item asks for one, it runs inside
/// BEGIN/COMMIT unless the enclosing step already opened a transaction.
pub fn execute_item(ctx: &AlignContext<'_>, item: &Item, in_step_transaction: bool) -> AlignResult<()> {
    if ctx.config.honor_transactions && item.transaction && !in_step_transaction {
        with_transaction(ctx.db, || dispatch(ctx, item))
    } else {
        dispatch(ctx, item)
    }
}

fn dispatch(ctx: &AlignContext<'_>, item: &Item) -> AlignResult<()> {
    match &item.kind {
        ItemKind::SqlFile { modify } => {
            let Some(path) = resolve_modify(ctx, modify) else {
                return Ok(());
            };
            execute_sql_file(ctx, &path, ScriptMode::Tolerant)?;
        }
        ItemKind::CsvFile { modify, table, key } => {
            let Some(path) = resolve_modify(ctx, modify) else {
                return Ok(());
            };
            log::debug!("Importing {} into {table}", path.display());
            import_csv(ctx.db, table, key.as_deref(), &path)?;
        }
        ItemKind::Execute { linux, windows } => {
            let os = OsFamily::current();
            match command_for(os, linux.as_deref(), windows.as_deref()) {
                Some(command) => run_logged(command, os),
                None => log::warn!(
                    "<execute> at line {} declares no command for this platform",
                    item.line
                ),
            }
        }
        ItemKind::Statement { sql } => {
            let name = format!("<statement> at line {}", item.line);
            execute_sql_text(ctx, sql, &name, ScriptMode::Tolerant)?;
        }
    }
    Ok(())
}

/// Resolve `modify` under the scripts directory; `None` if it cannot be read.
fn resolve_modify(ctx: &AlignContext<'_>, modify: &str) -> Option<PathBuf> {
    let path = ctx.scripts_dir().join(modify);
    match std::fs::File::open(&path) {
        Ok(_) if path.is_file() => Some(path),
        Ok(_) => {
            log::warn!("Cannot read {}: not a file", path.display());
            None
        }
        Err(e) => {
            log::warn!("Cannot read {}: {e}", path.display());
            None
        }
    }
}

/// Command declared for `os`, if any
pub fn command_for<'a>(
    os: OsFamily,
    linux: Option<&'a str>,
    windows: Option<&'a str>,
) -> Option<&'a str> {
    let command = match os {
        OsFamily::Linux | OsFamily::MacOs => linux,
        OsFamily::Windows => windows,
        OsFamily::Other => None,
    };
    command.map(str::trim).filter(|c| !c.is_empty())
}

/// Run `command` through the platform shell and capture its output
pub fn run_shell(command: &str, os: OsFamily) -> std::io::Result<Output> {
    if os == OsFamily::Windows {
        Command::new("cmd").args(["/C", command]).output()
    } else {
        Command::new("sh").args(["-c", command]).output()
    }
}

/// Shell failures never abort the run
fn run_logged(command: &str, os: OsFamily) {
    log::info!("Running: {command}");
    match run_shell(command, os) {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim().is_empty() {
                log::info!("stdout:\n{}", stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                log::warn!("stderr:\n{}", stderr.trim_end());
            }
            if !output.status.success() {
                log::warn!("Command '{command}' exited with {}", output.status);
            }
        }
        Err(e) => log::error!("Could not run '{command}': {e}"),
    }
}
