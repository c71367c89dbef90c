//! up-align - Alignment engine for updpilot
//!
//! Executes the steps of an `updpilot.xml` manifest against a database:
//! the step scheduler, per-item actions, the script reader, the macro
//! registry with its built-in macros, the duplicate resolver used by
//! `macro_createuniquepurge`, and the CSV upsert importer.

pub mod actions;
pub mod context;
pub mod csv_import;
pub mod error;
pub mod macros;
pub mod purge;
pub mod scheduler;
pub mod script;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{AlignContext, NoProgress, Progress};
pub use csv_import::{import_csv, CsvImportReport};
pub use error::{AlignError, AlignResult};
pub use macros::{MacroCall, MacroRegistry};
pub use purge::{purge_conflicts, PurgeReport};
pub use scheduler::Aligner;
pub use script::{execute_sql_file, ScriptMode, ScriptReport};
