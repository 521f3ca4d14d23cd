//! Modification timestamps and the metadata reads that produce them.

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Last-modified time of a file.
///
/// Compared by exact equality only. A file restored from a backup or touched
/// after a clock adjustment can carry an older time than before, and that
/// still counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp(SystemTime);

impl Timestamp {
    /// Wrap a raw system time.
    pub fn new(time: SystemTime) -> Self {
        Self(time)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self(time)
    }
}

/// Source of file modification times.
///
/// The registry performs every metadata read through this trait, so hosts
/// can substitute a cached or instrumented reader.
pub trait MetadataReader {
    /// Read the current modification time of `path`.
    fn modified(&self, path: &Path) -> io::Result<Timestamp>;
}

impl<R: MetadataReader + ?Sized> MetadataReader for &R {
    fn modified(&self, path: &Path) -> io::Result<Timestamp> {
        (**self).modified(path)
    }
}

/// Reads modification times straight from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadata;

impl MetadataReader for FsMetadata {
    fn modified(&self, path: &Path) -> io::Result<Timestamp> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        metadata.modified().map(Timestamp)
    }
}
