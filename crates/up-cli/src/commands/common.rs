//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use up_align::Progress;
use up_core::{AlignConfig, CoreError, StepVersion};
use up_db::{dialect_for, Dialect, DuckDbBackend};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run and the database is closed cleanly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ExitCode is control flow; nothing should reach stderr
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Project root plus its effective configuration
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: AlignConfig,
}

impl Project {
    /// Load the configuration and apply global overrides.
    ///
    /// A project without `updpilot.yml` runs on defaults unless `--config`
    /// names a file explicitly.
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let mut config = match &global.config {
            Some(path) => AlignConfig::load(Path::new(path))
                .context("Failed to load configuration file")?,
            None => match AlignConfig::load_from_dir(&root) {
                Ok(config) => config,
                Err(CoreError::ConfigNotFound { path }) => {
                    log::debug!("{path} not found; using defaults");
                    AlignConfig::default()
                }
                Err(e) => return Err(e).context("Failed to load project configuration"),
            },
        };

        if let Some(adapter) = &global.adapter {
            config.adapter = adapter.clone();
        }
        if let Some(database) = &global.database {
            config.database.path = database.clone();
        }
        config.validate().context("Invalid configuration")?;

        Ok(Self { root, config })
    }

    /// Open the configured database
    pub(crate) fn open_database(&self) -> Result<DuckDbBackend> {
        let path = &self.config.database.path;
        let db = if path == ":memory:" {
            DuckDbBackend::in_memory()
        } else {
            DuckDbBackend::from_path(&self.root.join(path))
        };
        db.with_context(|| format!("Failed to connect to database {path}"))
    }

    /// Dialect of the configured adapter
    pub(crate) fn dialect(&self) -> Box<dyn Dialect> {
        dialect_for(&self.config.adapter)
    }

    /// Resolve a path given on the command line against the project root
    pub(crate) fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Parse a `YYYY/WW` version from a flag
pub(crate) fn parse_version_flag(flag: &str, value: &str) -> Result<StepVersion> {
    value
        .parse()
        .with_context(|| format!("Invalid value for --{flag}"))
}

/// Print `value` as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Spinner shown while scripts run
pub(crate) struct SpinnerProgress {
    pb: ProgressBar,
}

impl SpinnerProgress {
    pub(crate) fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} statements)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Self { pb }
    }

    pub(crate) fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Progress for SpinnerProgress {
    fn step_started(&self, version: StepVersion) {
        self.pb.set_message(format!("step {version}"));
    }

    fn script_started(&self, name: &str) {
        self.pb.set_position(0);
        self.pb.set_message(name.to_string());
    }

    fn statement_done(&self, _ok: bool) {
        self.pb.inc(1);
    }

    fn script_finished(&self, name: &str, executed: usize, failed: usize) {
        if failed > 0 {
            self.pb
                .println(format!("  ! {name}: {executed} executed, {failed} failed"));
        }
    }
}
