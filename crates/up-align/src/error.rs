//! Error types for up-align

use thiserror::Error;
use up_core::{CoreError, StepVersion};
use up_db::DbError;

/// Alignment engine errors
#[derive(Error, Debug)]
pub enum AlignError {
    /// A001: Statement matched the macro syntax but no handler is registered
    #[error("[A001] Macro 'macro_{name}' is not defined")]
    UnknownMacro { name: String },

    /// A002: Macro arguments are malformed
    #[error("[A002] Syntax error in macro_{name}: {message} [{args}]")]
    MacroSyntax {
        name: String,
        args: String,
        message: String,
    },

    /// A003: Column list and value list reported for a duplicate differ in length
    #[error("[A003] Duplicate on {table}: {columns} does not match values {values}")]
    DuplicateMismatch {
        table: String,
        columns: String,
        values: String,
    },

    /// A004: The database keeps reporting a duplicate the resolver cannot remove
    #[error("[A004] Could not resolve duplicate ({columns})=({values}) on {table} for {index}")]
    DuplicateNotResolved {
        table: String,
        index: String,
        columns: String,
        values: String,
    },

    /// A005: CSV header is malformed
    #[error("[A005] Invalid CSV header in {path}: {message}")]
    CsvFormat { path: String, message: String },

    /// A006: CSV reader error
    #[error("[A006] Failed to read CSV {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A007: File could not be read
    #[error("[A007] IO error reading {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A008: A step failed; the run stops here
    #[error("[A008] Step {version} failed at <{element}> (line {line}): {source}")]
    StepFailed {
        version: StepVersion,
        element: String,
        line: u32,
        #[source]
        source: Box<AlignError>,
    },

    /// Core error (config, manifest, versions)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for AlignError
pub type AlignResult<T> = Result<T, AlignError>;

impl AlignError {
    /// Create a macro syntax error
    pub fn macro_syntax(name: &str, args: &str, message: impl Into<String>) -> Self {
        AlignError::MacroSyntax {
            name: name.to_string(),
            args: args.to_string(),
            message: message.into(),
        }
    }

    /// Errors that abort a script even in tolerant mode
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AlignError::UnknownMacro { .. } | AlignError::MacroSyntax { .. }
        )
    }
}
