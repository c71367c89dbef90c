//! Rebuild-views command implementation
//!
//! Re-executes every `*-viste.sql` script below the views directory, in
//! path order, tolerating failures.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use up_align::{execute_sql_file, AlignContext, ScriptMode, ScriptReport};

use crate::cli::{GlobalArgs, RebuildViewsArgs};
use crate::commands::common::{Project, SpinnerProgress};

/// Suffix of view definition scripts
pub(crate) const VIEW_SCRIPT_SUFFIX: &str = "-viste.sql";

/// Every view script below `dir`, sorted by path
pub(crate) fn discover_view_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**").join(format!("*{VIEW_SCRIPT_SUFFIX}"));
    let pattern = pattern.to_string_lossy();
    let mut scripts: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid search pattern {pattern}"))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .collect();
    scripts.sort();
    Ok(scripts)
}

/// Execute the rebuild-views command
pub(crate) fn execute(args: &RebuildViewsArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let dir = match &args.dir {
        Some(dir) => project.resolve(dir),
        None => project.config.views_dir_absolute(&project.root),
    };
    if !dir.is_dir() {
        anyhow::bail!("Views directory {} does not exist", dir.display());
    }

    let scripts = discover_view_scripts(&dir)?;
    if scripts.is_empty() {
        println!("No *{VIEW_SCRIPT_SUFFIX} files found in {}", dir.display());
        return Ok(());
    }

    let db = project.open_database()?;
    let dialect = project.dialect();
    let spinner = SpinnerProgress::new();
    let ctx = AlignContext::new(&db, dialect.as_ref(), &project.config, project.root.clone())
        .with_progress(&spinner);

    let mut total = ScriptReport::default();
    for script in &scripts {
        match execute_sql_file(&ctx, script, ScriptMode::Tolerant) {
            Ok(report) => total.merge(report),
            Err(e) => {
                spinner.finish();
                return Err(e).with_context(|| format!("Failed to execute {}", script.display()));
            }
        }
    }
    spinner.finish();

    println!(
        "Rebuilt views from {} file(s): {} statement(s) executed, {} failed",
        scripts.len(),
        total.executed,
        total.failed.len()
    );
    Ok(())
}
