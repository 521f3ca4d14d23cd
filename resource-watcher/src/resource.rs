//! A single watched file and the action that reloads it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ActionResult, ReloadError, Result};
use crate::timestamp::{MetadataReader, Timestamp};

/// Boxed reload action, invoked with the path of the changed file.
pub type ReloadAction = Box<dyn FnMut(&Path) -> ActionResult + Send + 'static>;

/// A file tracked for changes together with its reload action.
pub struct WatchedResource {
    /// Resolved path of the file.
    path: Arc<Path>,

    /// Modification time observed at the last refresh.
    last_modified: Timestamp,

    /// Action run once per detected change.
    on_change: ReloadAction,
}

impl WatchedResource {
    /// Create a resource for an existing file, reading its current
    /// modification time as the baseline.
    ///
    /// Fails with [`ReloadError::NotFound`] when the file does not exist or
    /// its metadata cannot be read.
    pub fn create<R, F>(path: impl Into<PathBuf>, on_change: F, reader: &R) -> Result<Self>
    where
        R: MetadataReader + ?Sized,
        F: FnMut(&Path) -> ActionResult + Send + 'static,
    {
        let path = path.into();
        let last_modified = reader
            .modified(&path)
            .map_err(|_| ReloadError::NotFound(path.clone()))?;

        Ok(Self::with_baseline(path, last_modified, on_change))
    }

    /// Create a resource with an explicit baseline.
    pub fn with_baseline<F>(path: impl Into<PathBuf>, last_modified: Timestamp, on_change: F) -> Self
    where
        F: FnMut(&Path) -> ActionResult + Send + 'static,
    {
        let path: PathBuf = path.into();
        Self {
            path: Arc::from(path),
            last_modified,
            on_change: Box::new(on_change),
        }
    }

    /// Path of the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared handle to the path, used as a cheap per-pass cache key.
    pub(crate) fn shared_path(&self) -> Arc<Path> {
        Arc::clone(&self.path)
    }

    /// Current baseline.
    pub fn last_modified(&self) -> Timestamp {
        self.last_modified
    }

    /// Compare `current` against the baseline, adopting it when different.
    ///
    /// Returns `true` when the file changed since the last refresh.
    pub fn check_and_refresh(&mut self, current: Timestamp) -> bool {
        if current == self.last_modified {
            return false;
        }
        self.last_modified = current;
        true
    }

    /// Run the reload action with this resource's path.
    ///
    /// The action must not poll the registry that owns this resource.
    pub fn invoke(&mut self) -> ActionResult {
        (self.on_change)(&self.path)
    }
}

impl fmt::Debug for WatchedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchedResource")
            .field("path", &self.path)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}
