//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use up_core::{Manifest, StepVersion};
use up_db::VersionStore;

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{print_json, Project};

#[derive(Debug, Serialize)]
struct StatusReport {
    installed: StepVersion,
    latest: Option<StepVersion>,
    pending: Vec<PendingStep>,
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
struct PendingStep {
    version: StepVersion,
    items: usize,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    version: StepVersion,
    applied_at: Option<String>,
}

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let manifest_path = project.config.manifest_absolute(&project.root);
    let manifest = Manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let db = project.open_database()?;
    let store = VersionStore::new(&db, project.config.version_table.clone());
    store.ensure().context("Failed to prepare version table")?;
    let installed = store.current().context("Failed to read installed version")?;

    let adapter = project.config.adapter.as_str();
    let report = StatusReport {
        installed,
        latest: manifest.last_step().map(|s| s.version),
        pending: manifest
            .pending(installed)
            .map(|s| PendingStep {
                version: s.version,
                items: s.items_for(Some(adapter)).len(),
            })
            .collect(),
        history: store
            .history()
            .context("Failed to read version history")?
            .into_iter()
            .map(|h| HistoryEntry {
                version: h.version,
                applied_at: h.applied_at.map(|t| t.to_string()),
            })
            .collect(),
    };

    match args.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_status(&report, adapter);
            Ok(())
        }
    }
}

fn print_status(report: &StatusReport, adapter: &str) {
    println!("Installed version: {}", report.installed);
    match report.latest {
        Some(latest) => println!("Manifest latest:   {latest}"),
        None => println!("Manifest latest:   (no steps)"),
    }

    if report.pending.is_empty() {
        println!("\nUp to date.");
    } else {
        println!("\nPending steps ({adapter}):");
        for step in &report.pending {
            println!("  {} ({} item(s))", step.version, step.items);
        }
    }

    if !report.history.is_empty() {
        println!("\nHistory:");
        for entry in &report.history {
            println!(
                "  {} {}",
                entry.version,
                entry.applied_at.as_deref().unwrap_or("-")
            );
        }
    }
}
