//! Host-side driver that owns a registry and polls it once per cycle.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::registry::ResourceRegistry;
use crate::report::PollReport;
use crate::timestamp::{FsMetadata, MetadataReader};

/// Owns a [`ResourceRegistry`] for the length of a session.
///
/// Interactive hosts call [`update`](Self::update) from their per-frame
/// hook. Hosts without a frame loop of their own can hand control to
/// [`run_until`](Self::run_until), which polls on a fixed interval.
pub struct ReloadHost<R = FsMetadata> {
    registry: ResourceRegistry<R>,
    interval: Duration,
    cycles: u64,
}

impl<R: MetadataReader> ReloadHost<R> {
    /// Create a host polling at the configured interval.
    pub fn new(registry: ResourceRegistry<R>, config: &RegistryConfig) -> Self {
        Self::with_interval(registry, config.poll_interval())
    }

    /// Create a host polling at `interval` (at least one millisecond).
    pub fn with_interval(registry: ResourceRegistry<R>, interval: Duration) -> Self {
        Self {
            registry,
            interval: interval.max(Duration::from_millis(1)),
            cycles: 0,
        }
    }

    /// The owned registry.
    pub fn registry(&self) -> &ResourceRegistry<R> {
        &self.registry
    }

    /// Mutable access, for registering resources during setup.
    pub fn registry_mut(&mut self) -> &mut ResourceRegistry<R> {
        &mut self.registry
    }

    /// Number of update cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one update cycle.
    pub fn update(&mut self) -> PollReport {
        self.cycles += 1;
        self.registry.poll()
    }

    /// Poll on the configured interval until `shutdown` completes.
    ///
    /// Returns the number of cycles run by this call. Late ticks are
    /// skipped rather than replayed in a burst.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let start = self.cycles;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            "Polling {} resources every {:?}",
            self.registry.len(),
            self.interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let report = self.update();
                    if report.has_changes() {
                        debug!("Cycle {}: reloaded {} resources", self.cycles, report.notified_count());
                    }
                }
            }
        }

        let ran = self.cycles - start;
        info!("Reload loop stopped after {ran} cycles");
        ran
    }

    /// End the session and return the registry.
    pub fn into_registry(self) -> ResourceRegistry<R> {
        self.registry
    }
}
