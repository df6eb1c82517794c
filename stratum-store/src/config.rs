//! Storage configuration.
//!
//! The configuration surface is intentionally small: the authoritative
//! backend is selected by name, and an out-of-band alternative source
//! (environment variable pointing at a JSON file or a named preset) can
//! replace the whole configuration in test environments.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming an alternative configuration source:
/// either `preset:<name>` or a path to a JSON configuration file.
pub const ALT_CONFIG_ENV: &str = "STRATUM_STORAGE_CONFIG";

const DEFAULT_VALUE_SIZE_LIMIT: usize = 64 * 1024;

fn default_value_size_limit() -> usize {
    DEFAULT_VALUE_SIZE_LIMIT
}

/// Configuration consumed by the storage core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Authoritative backend: `"sqlite"` (file-backed) or `"memory"`.
    /// Any other name fails engine construction.
    pub engine: String,

    /// Database file path. Required when `engine` is `"sqlite"`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Wipe all authoritative data during startup. Test/ops convenience.
    #[serde(default)]
    pub wipe_db_at_startup: bool,

    /// Maximum serialized size of a single stored value, in bytes.
    /// Oversized writes are rejected before they reach the backend.
    #[serde(default = "default_value_size_limit")]
    pub value_size_limit: usize,

    /// Skip the alternative-configuration lookup entirely. Test override.
    #[serde(default)]
    pub ignore_alternative_db_config: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: "sqlite".to_string(),
            db_path: None,
            wipe_db_at_startup: false,
            value_size_limit: DEFAULT_VALUE_SIZE_LIMIT,
            ignore_alternative_db_config: false,
        }
    }
}

impl StorageConfig {
    /// An in-memory configuration, the base of the test presets.
    pub fn memory() -> Self {
        Self {
            engine: "memory".to_string(),
            ..Self::default()
        }
    }

    /// Resolves a named preset profile. Used only for test environments.
    pub fn preset(name: &str) -> StorageResult<Self> {
        match name {
            "test-memory" => Ok(Self::memory()),
            "test-wipe" => Ok(Self {
                wipe_db_at_startup: true,
                ..Self::memory()
            }),
            other => Err(StorageError::Config(format!(
                "unknown configuration preset '{other}'"
            ))),
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> StorageResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!(
                "cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::Config(format!(
                "invalid configuration file {}: {e}",
                path.display()
            ))
        })
    }

    /// Applies the out-of-band alternative configuration, if any.
    ///
    /// Returns this configuration unchanged when
    /// `ignore_alternative_db_config` is set or the environment variable is
    /// absent. An unknown preset or unreadable file is a fatal error.
    pub fn resolve(self) -> StorageResult<Self> {
        if self.ignore_alternative_db_config {
            return Ok(self);
        }
        match env::var(ALT_CONFIG_ENV) {
            Ok(value) if !value.is_empty() => {
                if let Some(name) = value.strip_prefix("preset:") {
                    info!(preset = name, "using alternative configuration preset");
                    Self::preset(name)
                } else {
                    info!(path = %value, "loading alternative configuration file");
                    Self::from_json_file(Path::new(&value))
                }
            }
            _ => Ok(self),
        }
    }
}
