//! # Reload Host
//!
//! A minimal host session around the resource watcher: it loads every file
//! named in its configuration, registers a reload action per file and polls
//! the registry on a fixed cadence until shut down.

pub mod document;

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use reload_resource_watcher::{
    PathResolver, RegistryConfig, ReloadHost, ResourceRegistry, weak_action,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use document::Document;

/// Configuration for a host session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Search paths and poll cadence.
    #[serde(flatten)]
    pub registry: RegistryConfig,

    /// Logical names of the files to watch. A name listed twice gets two
    /// independent documents backed by the same file.
    pub files: Vec<String>,
}

impl HostConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.registry.validate()?;
        if config.files.is_empty() {
            bail!("config {} lists no files to watch", path.display());
        }
        Ok(config)
    }
}

/// A running session: the host loop plus the documents it keeps fresh.
pub struct Session {
    host: ReloadHost,
    documents: Vec<Arc<Mutex<Document>>>,
}

impl Session {
    /// Load and register every configured file.
    ///
    /// Names that cannot be resolved or read are skipped with a warning; the
    /// session fails only when nothing could be watched.
    pub fn start(config: &HostConfig) -> Result<Self> {
        let search = config.registry.search_path();
        let mut registry = ResourceRegistry::new();
        let mut documents = Vec::new();

        for name in &config.files {
            let Some(path) = search.resolve(name) else {
                warn!("Skipping {name}: not found in search path");
                continue;
            };
            let document = match Document::load(&path) {
                Ok(document) => {
                    info!(
                        "Loaded {} ({} lines)",
                        document.path().display(),
                        document.line_count()
                    );
                    Arc::new(Mutex::new(document))
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };

            let action = weak_action(&document, |doc: &mut Document, path| {
                doc.reload(path)?;
                Ok(())
            });
            match registry.register(&path, action) {
                Ok(_) => documents.push(document),
                Err(e) => warn!("Skipping {name}: {e}"),
            }
        }

        if registry.is_empty() {
            bail!("none of the {} configured files could be watched", config.files.len());
        }

        info!("Watching {} files", registry.paths().len());
        Ok(Self {
            host: ReloadHost::new(registry, &config.registry),
            documents,
        })
    }

    /// Documents in registration order.
    pub fn documents(&self) -> &[Arc<Mutex<Document>>] {
        &self.documents
    }

    /// Mutable access to the host, for driving cycles by hand.
    pub fn host_mut(&mut self) -> &mut ReloadHost {
        &mut self.host
    }

    /// Poll until `shutdown` completes. Returns the number of cycles run.
    pub async fn run<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        self.host.run_until(shutdown).await
    }

    /// Stop the session, releasing the documents before the registry.
    pub fn shutdown(self) {
        let Self { host, documents } = self;
        drop(documents);
        let stats = host.into_registry().stats();
        info!(
            "Session ended: {} polls, {} reloads, {} failures",
            stats.polls, stats.notifications, stats.failures
        );
    }
}

/// Wait for `signal` to fire.
///
/// When the signal cannot be installed the error is logged and the future
/// never completes, so the session keeps polling instead of exiting at once.
pub async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}
