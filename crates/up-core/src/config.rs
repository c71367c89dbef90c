//! Configuration types and parsing for updpilot.yml

use crate::error::{CoreError, CoreResult};
use crate::run_state::ForceOverride;
use crate::version::StepVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Alignment engine configuration from updpilot.yml
///
/// Passed explicitly to every engine component; nothing in the engine keeps
/// its own copy of the adapter or verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlignConfig {
    /// Target adapter name (`postgresql`, `duckdb`, `mysql`, ...).
    ///
    /// Manifest items whose `target` is neither this nor `all` are skipped.
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Manifest file, relative to the project directory
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Directory that `modify` attributes are resolved against
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Directory scanned for `*-viste.sql` files by `rebuild-views`
    #[serde(default = "default_scripts_dir")]
    pub views_dir: String,

    /// Scripts executed by `macro_build(...)`, in order
    #[serde(default)]
    pub build_scripts: Vec<String>,

    /// Replay every step from this version (`YYYY/WW`)
    #[serde(default)]
    pub force_from: Option<String>,

    /// Replay the newest step even if already applied
    #[serde(default)]
    pub force_last: bool,

    /// Wrap items declaring `transaction="true"` in a transaction
    #[serde(default)]
    pub honor_transactions: bool,

    /// Table recording the applied high-water mark
    #[serde(default = "default_version_table")]
    pub version_table: String,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_adapter() -> String {
    "duckdb".to_string()
}

fn default_manifest() -> String {
    "updpilot.xml".to_string()
}

fn default_scripts_dir() -> String {
    "sql".to_string()
}

fn default_version_table() -> String {
    "updpilot_version".to_string()
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            database: DatabaseConfig::default(),
            manifest: default_manifest(),
            scripts_dir: default_scripts_dir(),
            views_dir: default_scripts_dir(),
            build_scripts: Vec::new(),
            force_from: None,
            force_last: false,
            honor_transactions: false,
            version_table: default_version_table(),
        }
    }
}

impl AlignConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: AlignConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for updpilot.yml or updpilot.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("updpilot.yml");
        let yaml_path = dir.join("updpilot.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.adapter.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "adapter cannot be empty".to_string(),
            });
        }

        if self.version_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "version_table cannot be empty".to_string(),
            });
        }

        self.force_override()?;
        Ok(())
    }

    /// Parsed force overrides
    pub fn force_override(&self) -> CoreResult<ForceOverride> {
        let from = match &self.force_from {
            Some(s) => Some(StepVersion::parse_force(s).map_err(|e| {
                CoreError::ConfigInvalid {
                    message: format!("force_from: {e}"),
                }
            })?),
            None => None,
        };
        Ok(ForceOverride {
            from,
            last: self.force_last,
        })
    }

    /// Get absolute manifest path relative to a project root
    pub fn manifest_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.manifest)
    }

    /// Get absolute scripts directory relative to a project root
    pub fn scripts_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.scripts_dir)
    }

    /// Get absolute views directory relative to a project root
    pub fn views_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.views_dir)
    }

    /// Get absolute build script paths relative to a project root
    pub fn build_scripts_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.build_scripts.iter().map(|p| root.join(p)).collect()
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
