//! Configuration loading and management
//!
//! Handles parsing of `.pos.toml` configuration files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::model::{Rating, RATING_MAX, RATING_MIN};
use crate::priority::QuadrantThresholds;
use crate::sort::{SortDirection, SortSpec};

/// Name of the configuration file at the workspace root
pub const CONFIG_FILE: &str = ".pos.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Dataset location, relative to the workspace root
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Task listing configuration
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Leverage/effort matrix configuration
    #[serde(default)]
    pub matrix: MatrixConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            tasks: TasksConfig::default(),
            matrix: MatrixConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_data_file() -> String {
    ".pos/data.json".to_string()
}

/// Task listing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Sort field used when a view has none
    #[serde(default = "default_sort_field")]
    pub default_sort_field: String,

    /// Direction of the default sort (asc|desc)
    #[serde(default = "default_sort_direction")]
    pub default_sort_direction: String,

    /// Number of tasks in the dashboard's top priority list
    #[serde(default = "default_top_tasks")]
    pub top_tasks: usize,
}

fn default_sort_field() -> String {
    "priority_score".to_string()
}

fn default_sort_direction() -> String {
    "desc".to_string()
}

fn default_top_tasks() -> usize {
    5
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_sort_field: default_sort_field(),
            default_sort_direction: default_sort_direction(),
            top_tasks: default_top_tasks(),
        }
    }
}

/// Leverage/effort matrix configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Leverage at or above this counts as high
    #[serde(default = "default_threshold")]
    pub leverage_threshold: i64,

    /// Effort at or above this counts as high
    #[serde(default = "default_threshold")]
    pub effort_threshold: i64,
}

fn default_threshold() -> i64 {
    3
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            leverage_threshold: default_threshold(),
            effort_threshold: default_threshold(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// How long a writer waits for the data file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `.pos.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load configuration from the workspace root, or return defaults when
    /// there is no config file
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            debug!(root = %root.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Absolute dataset path for `root`
    pub fn data_path(&self, root: &Path) -> PathBuf {
        root.join(&self.data_file)
    }

    /// Sort applied when the active view has none
    pub fn default_sort(&self) -> Result<SortSpec> {
        let direction: SortDirection = self
            .tasks
            .default_sort_direction
            .parse()
            .map_err(|_| {
                Error::InvalidConfig(format!(
                    "tasks.default_sort_direction: invalid direction '{}' (expected asc|desc)",
                    self.tasks.default_sort_direction
                ))
            })?;
        Ok(SortSpec::new(self.tasks.default_sort_field.trim(), direction))
    }

    pub fn quadrant_thresholds(&self) -> Result<QuadrantThresholds> {
        Ok(QuadrantThresholds {
            leverage: threshold(self.matrix.leverage_threshold, "matrix.leverage_threshold")?,
            effort: threshold(self.matrix.effort_threshold, "matrix.effort_threshold")?,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.data_file.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "data_file cannot be empty".to_string(),
            ));
        }
        if self.tasks.default_sort_field.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.default_sort_field cannot be empty".to_string(),
            ));
        }
        self.default_sort()?;
        self.quadrant_thresholds()?;
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn threshold(value: i64, field: &str) -> Result<Rating> {
    Rating::new(value).map_err(|_| {
        Error::InvalidConfig(format!(
            "{field} must be between {RATING_MIN} and {RATING_MAX}, got {value}"
        ))
    })
}
