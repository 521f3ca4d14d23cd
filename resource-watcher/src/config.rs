//! Configuration for the resource registry and its host loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReloadError, Result};
use crate::resolver::{DEFAULT_SEARCH_PATH_ENV, SearchPath};

/// Configuration for resolving and polling watched resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directories searched for logical file names, in order.
    pub search_paths: Vec<PathBuf>,

    /// Environment variable holding extra search directories, searched
    /// after `search_paths`.
    pub search_path_env: Option<String>,

    /// Delay between poll passes when the host drives the loop.
    pub poll_interval_ms: u64,
}

impl RegistryConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            search_path_env: Some(DEFAULT_SEARCH_PATH_ENV.to_string()),
            // One frame at 60 Hz.
            poll_interval_ms: 16,
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Add a search directory.
    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    /// Set the environment variable read for extra search directories.
    pub fn with_search_path_env(mut self, var: impl Into<String>) -> Self {
        self.search_path_env = Some(var.into());
        self
    }

    /// Ignore the environment when building the search path.
    pub fn without_search_path_env(mut self) -> Self {
        self.search_path_env = None;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check the configuration for values the host loop cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ReloadError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.search_path_env.as_deref() == Some("") {
            return Err(ReloadError::Config(
                "search_path_env must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the resolver: configured directories first, then those from
    /// the environment variable.
    pub fn search_path(&self) -> SearchPath {
        let mut search = SearchPath::from_dirs(self.search_paths.iter().cloned());
        if let Some(var) = &self.search_path_env {
            search.extend(SearchPath::from_env(var));
        }
        search
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}
