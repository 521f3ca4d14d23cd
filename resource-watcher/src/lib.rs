//! # Resource Watcher
//!
//! Polling change detection for externally owned files such as shader
//! sources, scene files and textures. Each watched file carries a reload
//! action; a poll pass reads every distinct file's modification time once
//! and runs the action of every entry whose file changed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Resource Watcher                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  SearchPath ──► ResourceRegistry ──► PollReport                 │
//! │                    │         │                                  │
//! │                    ▼         ▼                                  │
//! │          WatchedResource   MetadataReader                       │
//! │                    │                                            │
//! │                    ▼                                            │
//! │              reload action (weak target)                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::{Arc, Mutex};
//! use reload_resource_watcher::{ResourceRegistry, SearchPath, weak_action};
//!
//! let shader = Arc::new(Mutex::new(Shader::load("toy.frag")?));
//! let mut registry = ResourceRegistry::new();
//! registry.register_named(
//!     &SearchPath::from_default_env(),
//!     "toy.frag",
//!     weak_action(&shader, |shader, path| shader.reload(path)),
//! )?;
//!
//! // Once per frame:
//! let report = registry.poll();
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod resource;
pub mod target;
pub mod timestamp;

pub use config::RegistryConfig;
pub use error::{ActionError, ActionResult, ReloadError, Result};
pub use host::ReloadHost;
pub use registry::{RegistryStats, ResourceHandle, ResourceRegistry};
pub use report::{FailureKind, Notification, PollFailure, PollReport};
pub use resolver::{PathResolver, SearchPath};
pub use resource::{ReloadAction, WatchedResource};
pub use target::{weak_action, weak_action_ref};
pub use timestamp::{FsMetadata, MetadataReader, Timestamp};
