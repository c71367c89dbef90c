//! up-db - Database abstraction layer for updpilot
//!
//! This crate provides the synchronous `Database` trait the alignment engine
//! runs against, catalog lookups built on it, per-adapter `Dialect`s that
//! render DDL and classify driver errors, the version store, and a DuckDB
//! implementation.

pub mod catalog;
pub mod dialect;
pub mod duckdb;
pub mod error;
pub(crate) mod row_helpers;
pub mod traits;
pub mod version_store;

pub use catalog::{ColumnInfo, SqlType};
pub use dialect::{
    dialect_for, Dialect, DuckDbDialect, ErrorClass, GenericDialect, PostgresDialect,
};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{with_transaction, Database, Row, SqlValue};
pub use version_store::{AppliedVersion, VersionStore};
