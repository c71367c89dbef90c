//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// updpilot - align a database to the steps of an updpilot.xml manifest
#[derive(Parser, Debug)]
#[command(name = "updpilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path
    #[arg(short, long, global = true, env = "UPDPILOT_DATABASE")]
    pub database: Option<String>,

    /// Override adapter (item target filter and SQL dialect)
    #[arg(short, long, global = true)]
    pub adapter: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending manifest step
    Run(RunArgs),

    /// Show installed version and pending steps
    Status(StatusArgs),

    /// Execute a single SQL script
    ExecSql(ExecSqlArgs),

    /// Upsert a CSV file into a table
    ImportCsv(ImportCsvArgs),

    /// Re-execute every *-viste.sql file
    RebuildViews(RebuildViewsArgs),
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Installed version (YYYY/WW); read from the version table when omitted
    #[arg(long)]
    pub installed: Option<String>,

    /// Replay every step from this version (YYYY/WW)
    #[arg(long)]
    pub force_from: Option<String>,

    /// Replay the newest step even when already applied
    #[arg(long)]
    pub force_last: bool,

    /// Do not write the reached version to the version table
    #[arg(long)]
    pub no_record: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the exec-sql command
#[derive(Args, Debug)]
pub struct ExecSqlArgs {
    /// Script to execute
    pub file: String,

    /// Stop at the first failing statement
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the import-csv command
#[derive(Args, Debug)]
pub struct ImportCsvArgs {
    /// CSV file with a header row
    pub file: String,

    /// Target table
    #[arg(short, long)]
    pub table: String,

    /// Key column; rows matching it are updated instead of inserted
    #[arg(short, long)]
    pub key: Option<String>,
}

/// Arguments for the rebuild-views command
#[derive(Args, Debug)]
pub struct RebuildViewsArgs {
    /// Directory to scan (default: views_dir from config)
    #[arg(long)]
    pub dir: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
