//! In-memory copies of watched files.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

/// The loaded contents of one watched file.
///
/// Stands in for the objects a real host rebuilds on change (a shader
/// program, a scene subtree): it is owned by the host and only referenced
/// weakly by its reload action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    contents: String,
    generation: u64,
}

impl Document {
    /// Read a file for the first time.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        Ok(Self {
            path,
            contents,
            generation: 0,
        })
    }

    /// Re-read the file after a change.
    pub fn reload(&mut self, path: &Path) -> io::Result<()> {
        self.contents = std::fs::read_to_string(path)?;
        self.generation += 1;
        info!(
            "Reloaded {} ({} bytes, {} lines, generation {})",
            path.display(),
            self.contents.len(),
            self.line_count(),
            self.generation
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Number of reloads since the first load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn line_count(&self) -> usize {
        self.contents.lines().count()
    }
}
