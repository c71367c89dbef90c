//! Run command implementation

use anyhow::{Context, Result};
use up_align::{AlignContext, Aligner};
use up_core::{Manifest, RunState};
use up_db::VersionStore;

use crate::cli::{GlobalArgs, OutputFormat, RunArgs};
use crate::commands::common::{parse_version_flag, print_json, Project, SpinnerProgress};

/// Execute the run command
pub(crate) fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let mut project = Project::load(global)?;
    if let Some(from) = &args.force_from {
        project.config.force_from = Some(from.clone());
    }
    if args.force_last {
        project.config.force_last = true;
    }
    project.config.validate().context("Invalid force options")?;

    let manifest_path = project.config.manifest_absolute(&project.root);
    let manifest = Manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
    log::debug!(
        "Loaded {} step(s) from {}",
        manifest.steps.len(),
        manifest_path.display()
    );

    let db = project.open_database()?;
    let store = VersionStore::new(&db, project.config.version_table.clone());
    store.ensure().context("Failed to prepare version table")?;
    let installed = match &args.installed {
        Some(v) => parse_version_flag("installed", v)?,
        None => store.current().context("Failed to read installed version")?,
    };
    log::info!("Installed version: {installed}");

    let dialect = project.dialect();
    let spinner = (args.output == OutputFormat::Text).then(SpinnerProgress::new);
    let mut ctx = AlignContext::new(&db, dialect.as_ref(), &project.config, project.root.clone());
    if let Some(spinner) = &spinner {
        ctx = ctx.with_progress(spinner);
    }

    let aligner = Aligner::new(ctx);
    let mut state = aligner.start(installed)?;
    let result = aligner.apply(&mut state, &manifest);
    if let Some(spinner) = &spinner {
        spinner.finish();
    }

    // steps that succeeded before a failure stay recorded
    if state.updated && !args.no_record {
        store
            .record(state.applied)
            .context("Failed to record applied version")?;
    }
    result.with_context(|| format!("Alignment failed after reaching {}", state.applied))?;

    match args.output {
        OutputFormat::Json => print_json(&state),
        OutputFormat::Text => {
            print_summary(&state);
            Ok(())
        }
    }
}

fn print_summary(state: &RunState) {
    if !state.updated {
        println!("Database already at {}; nothing to apply", state.installed);
        return;
    }
    for version in &state.executed {
        println!("  ✓ step {version}");
    }
    println!();
    println!(
        "Aligned {} -> {} ({} step(s) executed, {} skipped)",
        state.installed,
        state.applied,
        state.executed.len(),
        state.skipped.len()
    );
}
