//! Import-csv command implementation

use anyhow::{Context, Result};
use up_align::import_csv;

use crate::cli::{GlobalArgs, ImportCsvArgs};
use crate::commands::common::Project;

/// Execute the import-csv command
pub(crate) fn execute(args: &ImportCsvArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let path = project.resolve(&args.file);
    let db = project.open_database()?;

    let report = import_csv(&db, &args.table, args.key.as_deref(), &path)
        .with_context(|| format!("Failed to import {} into {}", path.display(), args.table))?;

    println!(
        "{} -> {}: {} inserted, {} updated, {} skipped",
        path.display(),
        args.table,
        report.inserted,
        report.updated,
        report.skipped
    );
    Ok(())
}
