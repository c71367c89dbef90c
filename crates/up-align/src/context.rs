//! Engine context threaded through every component
//!
//! Holds the connection, the adapter's dialect, configuration and the
//! project root. Nothing in here is mutated during a run.

use crate::macros::{builtin_registry, MacroRegistry};
use std::path::{Path, PathBuf};
use up_core::{AlignConfig, StepVersion};
use up_db::{Database, Dialect};

/// Liveness callbacks for long runs.
///
/// Every method defaults to a no-op.
pub trait Progress {
    /// A step is about to execute
    fn step_started(&self, _version: StepVersion) {}

    /// A script is about to run
    fn script_started(&self, _name: &str) {}

    /// One statement of a tolerant script finished
    fn statement_done(&self, _ok: bool) {}

    /// A script finished
    fn script_finished(&self, _name: &str, _executed: usize, _failed: usize) {}
}

/// Progress sink that reports nothing
pub struct NoProgress;

impl Progress for NoProgress {}

static NO_PROGRESS: NoProgress = NoProgress;

/// Everything an engine component needs
pub struct AlignContext<'a> {
    /// Target database
    pub db: &'a dyn Database,
    /// SQL dialect of the configured adapter
    pub dialect: &'a dyn Dialect,
    /// Run configuration
    pub config: &'a AlignConfig,
    /// Registered macros
    pub macros: &'a MacroRegistry,
    /// Progress sink
    pub progress: &'a dyn Progress,
    root: PathBuf,
}

impl<'a> AlignContext<'a> {
    /// Create a context with the built-in macros and no progress output
    pub fn new(
        db: &'a dyn Database,
        dialect: &'a dyn Dialect,
        config: &'a AlignConfig,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            dialect,
            config,
            macros: builtin_registry(),
            progress: &NO_PROGRESS,
            root: root.into(),
        }
    }

    /// Replace the progress sink
    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the macro registry
    pub fn with_macros(mut self, macros: &'a MacroRegistry) -> Self {
        self.macros = macros;
        self
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory `modify` attributes resolve against
    pub fn scripts_dir(&self) -> PathBuf {
        self.config.scripts_dir_absolute(&self.root)
    }

    /// Configured adapter name
    pub fn adapter(&self) -> &str {
        &self.config.adapter
    }
}
