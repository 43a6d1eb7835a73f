//! qos.toml configuration parser.
//!
//! The catalog path has a sensible default and can be overridden by
//! config file or CLI flag.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum number of containers a single spec may be bound to.
pub const DEFAULT_REPLICATION_CAP: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Location of the catalog database file.
    pub catalog_path: PathBuf,
    /// Replication cap for the scheduler's combinatorial search.
    pub replication_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            replication_cap: DEFAULT_REPLICATION_CAP,
        }
    }
}

/// `$HOME/.qos/qos.db`, or `./qos.db` when no home directory is set.
pub fn default_catalog_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(".qos").join("qos.db"),
        None => PathBuf::from("qos.db"),
    }
}

/// Optional-field mirror of [`EngineConfig`] for the config file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    catalog_path: Option<PathBuf>,
    replication_cap: Option<usize>,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, crate::records::RecordError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::records::RecordError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(text: &str) -> Result<Self, crate::records::RecordError> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = Self::default();
        Ok(Self {
            catalog_path: file.catalog_path.unwrap_or(defaults.catalog_path),
            replication_cap: file.replication_cap.unwrap_or(defaults.replication_cap),
        })
    }
}
