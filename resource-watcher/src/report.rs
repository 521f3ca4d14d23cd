//! Outcome of a single poll pass.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::ResourceHandle;

/// A reload action that ran during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Resource whose action ran.
    pub handle: ResourceHandle,

    /// Path of the changed file.
    pub path: PathBuf,
}

/// Kind of per-entry failure recorded during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file's modification time could not be read.
    MetadataRead,

    /// The reload action returned an error.
    Callback,
}

/// A failure isolated to one entry of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollFailure {
    /// Entry the failure belongs to.
    pub handle: ResourceHandle,

    /// Path of the entry.
    pub path: PathBuf,

    /// What failed.
    pub kind: FailureKind,

    /// Rendered error message.
    pub message: String,
}

/// Summary of one poll pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollReport {
    /// When the pass started.
    pub polled_at: DateTime<Utc>,

    /// Actions run during the pass, in notification order.
    pub notified: Vec<Notification>,

    /// Number of metadata reads performed.
    pub stat_checks: usize,

    /// Failures absorbed during the pass.
    pub failures: Vec<PollFailure>,
}

impl PollReport {
    /// Create an empty report stamped with the current time.
    pub fn new() -> Self {
        Self {
            polled_at: Utc::now(),
            notified: Vec::new(),
            stat_checks: 0,
            failures: Vec::new(),
        }
    }

    /// Number of actions run during the pass.
    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }

    /// Whether any action ran.
    pub fn has_changes(&self) -> bool {
        !self.notified.is_empty()
    }

    /// Whether the pass recorded any failure.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failures of the given kind.
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &PollFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

impl Default for PollReport {
    fn default() -> Self {
        Self::new()
    }
}
