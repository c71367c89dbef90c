//! CLI command implementations

pub(crate) mod common;
pub(crate) mod exec_sql;
pub(crate) mod import_csv;
pub(crate) mod rebuild_views;
pub(crate) mod run;
pub(crate) mod status;
