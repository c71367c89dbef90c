//! Step scheduler
//!
//! Walks the manifest in version order, executes every step newer than the
//! effective baseline and reports the resulting [`RunState`]. A failing step
//! aborts the run; nothing is retried, and the state keeps the last step
//! that did succeed.

use crate::actions::execute_item;
use crate::context::AlignContext;
use crate::error::{AlignError, AlignResult};
use crate::script::{execute_sql_file, ScriptMode, ScriptReport};
use std::path::Path;
use up_core::{Manifest, RunState, Step, StepVersion};
use up_db::with_transaction;

/// Drives a manifest against one database
pub struct Aligner<'a> {
    ctx: AlignContext<'a>,
}

impl<'a> Aligner<'a> {
    /// Create an aligner
    pub fn new(ctx: AlignContext<'a>) -> Self {
        Self { ctx }
    }

    /// Fresh run state for `installed` under the configured force options
    pub fn start(&self, installed: StepVersion) -> AlignResult<RunState> {
        let force = self.ctx.config.force_override()?;
        if let Some(from) = force.from {
            log::info!("Forcing replay of every step from {from}");
        }
        Ok(RunState::new(installed, force))
    }

    /// Execute the steps of `manifest` that `state` selects.
    ///
    /// `state` advances after every successful step, so on error it still
    /// holds the high-water mark reached before the failing step.
    pub fn apply(&self, state: &mut RunState, manifest: &Manifest) -> AlignResult<()> {
        let force = state.force;
        let mut last_executed = false;
        for step in &manifest.steps {
            if state.is_pending(step.version) {
                log::info!("Applying step {}", step.version);
                self.execute_step(step)?;
                state.mark_executed(step.version);
                last_executed = true;
            } else {
                log::debug!("Step {} already applied", step.version);
                state.mark_skipped(step.version);
                last_executed = false;
            }
        }

        if force.last && force.from.is_none() && !last_executed {
            if let Some(step) = manifest.last_step() {
                log::info!("Re-applying last step {}", step.version);
                self.execute_step(step)?;
                state.mark_executed(step.version);
            }
        }

        if state.updated {
            log::info!("Database aligned to {}", state.applied);
        } else {
            log::info!("Database already at {}; nothing to apply", state.installed);
        }
        Ok(())
    }

    /// Execute the items of one step that target the configured adapter.
    pub fn execute_step(&self, step: &Step) -> AlignResult<()> {
        self.ctx.progress.step_started(step.version);
        let in_transaction = self.ctx.config.honor_transactions && step.transaction;
        let items = step.items_for(Some(self.ctx.adapter()));

        let body = || -> AlignResult<()> {
            for item in &items {
                execute_item(&self.ctx, item, in_transaction).map_err(|e| {
                    AlignError::StepFailed {
                        version: step.version,
                        element: item.kind.element_name().to_string(),
                        line: item.line,
                        source: Box::new(e),
                    }
                })?;
            }
            Ok(())
        };

        if in_transaction {
            with_transaction(self.ctx.db, body)
        } else {
            body()
        }
    }

    /// Execute a single SQL file outside any manifest
    pub fn run_file(&self, path: &Path, mode: ScriptMode) -> AlignResult<ScriptReport> {
        execute_sql_file(&self.ctx, path, mode)
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
