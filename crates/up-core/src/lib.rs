//! up-core - Core library for updpilot
//!
//! This crate provides the shared types used by the alignment engine:
//! configuration parsing, the `updpilot.xml` manifest model, step versions,
//! run state, and small SQL string helpers.

pub mod config;
pub mod error;
pub mod manifest;
pub mod platform;
pub mod run_state;
pub mod sql_utils;
pub mod version;

pub use config::{AlignConfig, DatabaseConfig};
pub use error::{CoreError, CoreResult};
pub use manifest::{Item, ItemKind, Manifest, Step};
pub use platform::OsFamily;
pub use run_state::{ForceOverride, RunState};
pub use version::StepVersion;
