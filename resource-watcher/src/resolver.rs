//! Resolution of logical file names against an ordered search path.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable read by [`SearchPath::from_default_env`].
pub const DEFAULT_SEARCH_PATH_ENV: &str = "RELOAD_FILE_PATH";

/// Turns a logical file reference into an absolute, checkable path.
pub trait PathResolver {
    /// Resolve `name`, returning `None` when no matching file exists.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Ordered list of base directories searched for data files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Create an empty search path. Only absolute and working-directory
    /// relative names resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a search path from directories, searched in order.
    pub fn from_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Read directories from an environment variable holding a
    /// platform-separated path list. An unset variable yields an empty
    /// search path.
    pub fn from_env(var: &str) -> Self {
        match std::env::var_os(var) {
            Some(value) => Self::from_dirs(
                std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()),
            ),
            None => Self::new(),
        }
    }

    /// Read directories from [`DEFAULT_SEARCH_PATH_ENV`].
    pub fn from_default_env() -> Self {
        Self::from_env(DEFAULT_SEARCH_PATH_ENV)
    }

    /// Append a directory to the end of the search order.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    /// Append every directory of `other` after this one's.
    pub fn extend(&mut self, other: SearchPath) {
        self.dirs.extend(other.dirs);
    }

    /// Directories in search order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn existing_file(candidate: &Path) -> Option<PathBuf> {
        if !candidate.is_file() {
            return None;
        }
        // Canonical form so that two spellings of one file share a dedup key.
        std::fs::canonicalize(candidate).ok()
    }
}

impl PathResolver for SearchPath {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let name_path = Path::new(name);

        if let Some(found) = Self::existing_file(name_path) {
            return Some(found);
        }
        if name_path.is_absolute() {
            debug!("Absolute path does not exist: {name}");
            return None;
        }

        let found = self
            .dirs
            .iter()
            .find_map(|dir| Self::existing_file(&dir.join(name_path)));

        if found.is_none() {
            debug!("{name} not found in {} search directories", self.dirs.len());
        }
        found
    }
}

impl<F> PathResolver for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}
