//! SQL script reader and executor
//!
//! Scripts are read line by line. Each line is trimmed and appended to the
//! current statement; a line ending in `;` closes it. Lines starting with
//! `--` are comments. Every statement is offered to the macro registry
//! before it reaches the database.

use crate::context::AlignContext;
use crate::error::{AlignError, AlignResult};
use crate::macros::MacroCall;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

/// How statement failures are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
    /// The first failure aborts the script
    Strict,
    /// Failures are logged and the script continues
    Tolerant,
}

/// One statement extracted from a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStatement {
    /// Statement text without the closing `;`
    pub sql: String,
    /// False for text left over at end of input with no closing `;`
    pub terminated: bool,
}

/// Splits a line-oriented script into statements
pub struct StatementReader<R> {
    lines: io::Lines<R>,
    buffer: String,
    finished: bool,
}

impl<R: BufRead> StatementReader<R> {
    /// Read statements from `reader`
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            buffer: String::new(),
            finished: false,
        }
    }

    fn take(&mut self, terminated: bool) -> Option<ScriptStatement> {
        let text = std::mem::take(&mut self.buffer);
        let text = text.trim();
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        if text.is_empty() {
            None
        } else {
            Some(ScriptStatement {
                sql: text.to_string(),
                terminated,
            })
        }
    }
}

impl<R: BufRead> Iterator for StatementReader<R> {
    type Item = io::Result<ScriptStatement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    return self.take(false).map(Ok);
                }
            };

            let line = line.trim();
            if line.is_empty() || line.starts_with("--") {
                continue;
            }
            if !self.buffer.is_empty() {
                self.buffer.push_str("\n ");
            }
            self.buffer.push_str(line);

            if line.ends_with(';') {
                if let Some(statement) = self.take(true) {
                    return Some(Ok(statement));
                }
            }
        }
    }
}

/// A statement that failed in tolerant mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStatement {
    /// Statement text
    pub sql: String,
    /// Error message
    pub message: String,
}

/// Outcome of one script
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    /// Statements (and macros) that succeeded
    pub executed: usize,
    /// Statements that failed and were skipped
    pub failed: Vec<FailedStatement>,
}

impl ScriptReport {
    /// Failure count per table touched by the failing statement
    pub fn failures_by_table(&self) -> BTreeMap<String, usize> {
        let mut by_table = BTreeMap::new();
        for failure in &self.failed {
            *by_table.entry(statement_table(&failure.sql)).or_insert(0) += 1;
        }
        by_table
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: ScriptReport) {
        self.executed += other.executed;
        self.failed.extend(other.failed);
    }
}

fn relation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(?:ALTER\s+TABLE|CREATE\s+(?:OR\s+REPLACE\s+)?(?:TABLE|VIEW)|DROP\s+(?:TABLE|VIEW)|INSERT\s+INTO|DELETE\s+FROM|UPDATE|INDEX\s+\S+\s+ON)\s+(?:IF\s+(?:NOT\s+)?EXISTS\s+)?([\w."]+)"#,
        )
        .expect("valid regex")
    })
}

/// Best-effort name of the relation a statement touches
pub fn statement_table(sql: &str) -> String {
    if let Some(call) = MacroCall::parse(sql) {
        if let Some(first) = call.args.split(';').next().map(str::trim) {
            if !first.is_empty() {
                return first.to_ascii_lowercase();
            }
        }
    }
    relation_regex()
        .captures(sql)
        .map(|caps| caps[1].trim_matches('"').to_ascii_lowercase())
        .unwrap_or_else(|| "(unknown)".to_string())
}

/// Execute one statement: macro first, raw SQL otherwise
pub fn execute_statement(ctx: &AlignContext<'_>, sql: &str) -> AlignResult<()> {
    log::trace!("{sql}");
    if ctx.macros.try_execute(ctx, sql)? {
        return Ok(());
    }
    let sql = ctx.dialect.rewrite_statement(sql);
    ctx.db.execute(&sql)?;
    Ok(())
}

/// Execute every statement read from `reader`.
///
/// `name` identifies the script in logs. In tolerant mode macro syntax
/// errors and unknown macros still abort the script.
pub fn execute_script<R: BufRead>(
    ctx: &AlignContext<'_>,
    reader: R,
    name: &str,
    mode: ScriptMode,
) -> AlignResult<ScriptReport> {
    ctx.progress.script_started(name);
    let mut report = ScriptReport::default();

    for statement in StatementReader::new(reader) {
        let statement = statement.map_err(|e| AlignError::IoWithPath {
            path: name.to_string(),
            source: e,
        })?;

        if !statement.terminated && mode == ScriptMode::Strict {
            log::warn!("{name}: ignoring trailing text without ';': {}", statement.sql);
            continue;
        }

        match execute_statement(ctx, &statement.sql) {
            Ok(()) => {
                report.executed += 1;
                ctx.progress.statement_done(true);
            }
            Err(e) if mode == ScriptMode::Strict || e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("{name}: statement failed: {e}\n{}", statement.sql);
                report.failed.push(FailedStatement {
                    sql: statement.sql,
                    message: e.to_string(),
                });
                ctx.progress.statement_done(false);
            }
        }
    }

    log_summary(name, &report);
    ctx.progress
        .script_finished(name, report.executed, report.failed.len());
    Ok(report)
}

/// Execute an SQL script file
pub fn execute_sql_file(
    ctx: &AlignContext<'_>,
    path: &Path,
    mode: ScriptMode,
) -> AlignResult<ScriptReport> {
    let file = File::open(path).map_err(|e| AlignError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;
    log::info!("=== Processing {} ===", path.display());
    execute_script(ctx, BufReader::new(file), &path.display().to_string(), mode)
}

/// Execute SQL held in memory
pub fn execute_sql_text(
    ctx: &AlignContext<'_>,
    text: &str,
    name: &str,
    mode: ScriptMode,
) -> AlignResult<ScriptReport> {
    execute_script(ctx, text.as_bytes(), name, mode)
}

fn log_summary(name: &str, report: &ScriptReport) {
    if report.failed.is_empty() {
        log::info!("{name}: {} statement(s) executed", report.executed);
        return;
    }
    log::warn!(
        "{name}: {} statement(s) executed, {} failed",
        report.executed,
        report.failed.len()
    );
    for (table, count) in report.failures_by_table() {
        log::warn!("  {table}: {count} error(s)");
    }
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
