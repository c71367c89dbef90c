//! Error types for up-core

use thiserror::Error;

/// Core error type for updpilot
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: Step version string could not be parsed
    #[error("[C003] Invalid step version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    /// C004: Manifest is not well-formed XML
    #[error("[C004] Failed to parse manifest {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// C005: Manifest element is missing a required attribute or has a bad value
    #[error("[C005] Invalid manifest element <{element}> at line {line}: {message}")]
    ManifestInvalid {
        element: String,
        line: u32,
        message: String,
    },

    /// C006: IO error
    #[error("[C006] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C007: IO error with file path context
    #[error("[C007] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C008: YAML parse error
    #[error("[C008] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
