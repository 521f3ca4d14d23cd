//! Ordered registry of watched resources and the poll pass.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ActionResult, ReloadError, Result};
use crate::report::{FailureKind, Notification, PollFailure, PollReport};
use crate::resolver::PathResolver;
use crate::resource::WatchedResource;
use crate::timestamp::{FsMetadata, MetadataReader, Timestamp};

/// Opaque identifier of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// Build a handle from its raw value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of the handle.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Entry {
    handle: ResourceHandle,
    resource: WatchedResource,
}

/// Ordered set of watched resources.
///
/// [`poll`](Self::poll) reads each distinct path at most once per call and
/// notifies every entry sharing a changed path, in registration order.
/// Registration and polling both need `&mut self`, so an action can never
/// re-enter the registry that is running it.
pub struct ResourceRegistry<R = FsMetadata> {
    /// Entries in registration order.
    entries: Vec<Entry>,

    /// Source of modification times.
    reader: R,

    /// Next handle to hand out.
    next_handle: u64,

    /// Lifetime counters.
    polls: u64,
    notifications: u64,
    failures: u64,
}

impl ResourceRegistry<FsMetadata> {
    /// Create an empty registry reading the filesystem.
    pub fn new() -> Self {
        Self::with_reader(FsMetadata)
    }
}

impl Default for ResourceRegistry<FsMetadata> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: MetadataReader> ResourceRegistry<R> {
    /// Create an empty registry using a custom metadata reader.
    pub fn with_reader(reader: R) -> Self {
        Self {
            entries: Vec::new(),
            reader,
            next_handle: 1,
            polls: 0,
            notifications: 0,
            failures: 0,
        }
    }

    /// The metadata reader in use.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Watch an already-resolved file.
    ///
    /// The file's current modification time becomes the baseline, so the
    /// action first runs on the next change after registration. Fails with
    /// [`ReloadError::NotFound`] and leaves the registry untouched when the
    /// file cannot be read.
    pub fn register<F>(&mut self, path: impl Into<PathBuf>, on_change: F) -> Result<ResourceHandle>
    where
        F: FnMut(&Path) -> ActionResult + Send + 'static,
    {
        let resource = WatchedResource::create(path, on_change, &self.reader)?;
        Ok(self.register_resource(resource))
    }

    /// Resolve `name` through `resolver`, then watch the result.
    pub fn register_named<P, F>(&mut self, resolver: &P, name: &str, on_change: F) -> Result<ResourceHandle>
    where
        P: PathResolver + ?Sized,
        F: FnMut(&Path) -> ActionResult + Send + 'static,
    {
        let path = resolver.resolve(name).ok_or_else(|| {
            warn!("{name} not found in search path");
            ReloadError::NotFound(PathBuf::from(name))
        })?;
        self.register(path, on_change)
    }

    /// Append a resource constructed elsewhere.
    pub fn register_resource(&mut self, resource: WatchedResource) -> ResourceHandle {
        let handle = ResourceHandle(self.next_handle);
        self.next_handle += 1;

        info!("Observing {}", resource.path().display());
        self.entries.push(Entry { handle, resource });
        handle
    }

    /// Stop watching a resource. Remaining entries keep their order.
    pub fn unregister(&mut self, handle: ResourceHandle) -> Result<WatchedResource> {
        let index = self
            .entries
            .iter()
            .position(|e| e.handle == handle)
            .ok_or(ReloadError::UnknownHandle(handle))?;

        let entry = self.entries.remove(index);
        info!("Stopped observing {}", entry.resource.path().display());
        Ok(entry.resource)
    }

    /// Run one change-detection pass.
    ///
    /// Every entry on a path that was read successfully adopts the time read
    /// this pass, so removing one alias never leaves another with a stale
    /// baseline.
    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::new();
        let mut checked: HashMap<Arc<Path>, Option<(bool, Timestamp)>> =
            HashMap::with_capacity(self.entries.len());

        for entry in &mut self.entries {
            let changed = match checked.get(entry.resource.path()) {
                Some(Some((changed, current))) => {
                    entry.resource.check_and_refresh(*current);
                    *changed
                }
                Some(None) => false,
                None => {
                    report.stat_checks += 1;
                    let outcome = match self.reader.modified(entry.resource.path()) {
                        Ok(current) => Some((entry.resource.check_and_refresh(current), current)),
                        Err(source) => {
                            let err = ReloadError::MetadataRead {
                                path: entry.resource.path().to_path_buf(),
                                source,
                            };
                            warn!("{err}");
                            report.failures.push(PollFailure {
                                handle: entry.handle,
                                path: entry.resource.path().to_path_buf(),
                                kind: FailureKind::MetadataRead,
                                message: err.to_string(),
                            });
                            None
                        }
                    };
                    checked.insert(entry.resource.shared_path(), outcome);
                    outcome.is_some_and(|(changed, _)| changed)
                }
            };

            if changed {
                dispatch(entry, &mut report);
            }
        }

        self.record(&report);
        if report.has_changes() || report.has_failures() {
            debug!(
                "Poll pass: {} notified, {} stat checks, {} failures",
                report.notified_count(),
                report.stat_checks,
                report.failures.len()
            );
        }
        report
    }

    /// Run the action of every entry watching `path` without reading its
    /// metadata. Baselines are left untouched.
    pub fn trigger(&mut self, path: &Path) -> PollReport {
        let mut report = PollReport::new();
        for entry in self.entries.iter_mut().filter(|e| e.resource.path() == path) {
            dispatch(entry, &mut report);
        }
        self.notifications += report.notified_count() as u64;
        self.failures += report.failures.len() as u64;
        report
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `handle` is registered.
    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Look up a registered resource.
    pub fn get(&self, handle: ResourceHandle) -> Option<&WatchedResource> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| &e.resource)
    }

    /// Handles in registration order.
    pub fn handles(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        self.entries.iter().map(|e| e.handle)
    }

    /// Distinct watched paths, in order of first registration.
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = Vec::new();
        for entry in &self.entries {
            let path = entry.resource.path();
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Statistics about the registry.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_entries: self.entries.len(),
            unique_paths: self.paths().len(),
            polls: self.polls,
            notifications: self.notifications,
            failures: self.failures,
        }
    }

    fn record(&mut self, report: &PollReport) {
        self.polls += 1;
        self.notifications += report.notified_count() as u64;
        self.failures += report.failures.len() as u64;
    }
}

fn dispatch(entry: &mut Entry, report: &mut PollReport) {
    let path = entry.resource.path().to_path_buf();
    debug!("Reloading {}", path.display());

    if let Err(e) = entry.resource.invoke() {
        let err = ReloadError::Callback {
            path: path.clone(),
            message: e.to_string(),
        };
        warn!("{err}");
        report.failures.push(PollFailure {
            handle: entry.handle,
            path: path.clone(),
            kind: FailureKind::Callback,
            message: err.to_string(),
        });
    }

    report.notified.push(Notification {
        handle: entry.handle,
        path,
    });
}

impl<R> fmt::Debug for ResourceRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("entries", &self.entries.len())
            .field("polls", &self.polls)
            .finish_non_exhaustive()
    }
}

/// Statistics about a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Registered entries.
    pub total_entries: usize,

    /// Distinct paths among the entries.
    pub unique_paths: usize,

    /// Poll passes run so far.
    pub polls: u64,

    /// Actions run so far.
    pub notifications: u64,

    /// Failures absorbed so far.
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};

    /// In-memory metadata source that counts reads.
    #[derive(Default)]
    struct FakeFs {
        files: RefCell<HashMap<PathBuf, io::Result<Timestamp>>>,
        reads: RefCell<usize>,
    }

    impl FakeFs {
        fn set(&self, path: &str, secs: u64) {
            let stamp = Timestamp::new(SystemTime::UNIX_EPOCH + Duration::from_secs(secs));
            self.files.borrow_mut().insert(PathBuf::from(path), Ok(stamp));
        }

        fn fail(&self, path: &str) {
            self.files.borrow_mut().insert(
                PathBuf::from(path),
                Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            );
        }

        fn reads(&self) -> usize {
            *self.reads.borrow()
        }
    }

    impl MetadataReader for FakeFs {
        fn modified(&self, path: &Path) -> io::Result<Timestamp> {
            *self.reads.borrow_mut() += 1;
            match self.files.borrow().get(path) {
                Some(Ok(stamp)) => Ok(*stamp),
                Some(Err(e)) => Err(io::Error::from(e.kind())),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, label: &str) -> impl FnMut(&Path) -> ActionResult + Send + use<> {
        let log = Arc::clone(log);
        let label = label.to_string();
        move |_: &Path| -> ActionResult {
            log.lock().unwrap().push(label.clone());
            Ok(())
        }
    }

    #[test]
    fn test_shared_path_notifies_every_entry_with_one_read() {
        let fs = FakeFs::default();
        fs.set("/shader.frag", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry.register("/shader.frag", recorder(&log, "R1")).unwrap();
        registry.register("/shader.frag", recorder(&log, "R2")).unwrap();
        registry.register("/shader.frag", recorder(&log, "R3")).unwrap();

        fs.set("/shader.frag", 2);
        let before = fs.reads();
        let report = registry.poll();

        assert_eq!(fs.reads() - before, 1);
        assert_eq!(report.stat_checks, 1);
        assert_eq!(report.notified_count(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["R1", "R2", "R3"]);
    }

    #[test]
    fn test_second_poll_after_change_is_quiet() {
        let fs = FakeFs::default();
        fs.set("/mesh.dat", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry.register("/mesh.dat", recorder(&log, "R3")).unwrap();

        fs.set("/mesh.dat", 5);
        assert_eq!(registry.poll().notified_count(), 1);
        assert_eq!(registry.poll().notified_count(), 0);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_notification_follows_registration_order() {
        let fs = FakeFs::default();
        fs.set("/a.vert", 1);
        fs.set("/b.frag", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry.register("/b.frag", recorder(&log, "b1")).unwrap();
        registry.register("/a.vert", recorder(&log, "a1")).unwrap();
        registry.register("/b.frag", recorder(&log, "b2")).unwrap();

        fs.set("/a.vert", 2);
        fs.set("/b.frag", 2);
        let report = registry.poll();

        assert_eq!(report.stat_checks, 2);
        assert_eq!(*log.lock().unwrap(), vec!["b1", "a1", "b2"]);
    }

    #[test]
    fn test_metadata_failure_is_isolated_and_retried() {
        let fs = FakeFs::default();
        fs.set("/a.frag", 1);
        fs.set("/b.frag", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        let a = registry.register("/a.frag", recorder(&log, "A")).unwrap();
        registry.register("/a.frag", recorder(&log, "A2")).unwrap();
        registry.register("/b.frag", recorder(&log, "B")).unwrap();

        fs.fail("/a.frag");
        fs.set("/b.frag", 2);
        let report = registry.poll();

        assert_eq!(*log.lock().unwrap(), vec!["B"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].handle, a);
        assert_eq!(report.failures[0].kind, FailureKind::MetadataRead);
        assert_eq!(registry.len(), 3);

        // File comes back with a new time: both aliases fire.
        fs.set("/a.frag", 3);
        let report = registry.poll();
        assert!(!report.has_failures());
        assert_eq!(*log.lock().unwrap(), vec!["B", "A", "A2"]);
    }

    #[test]
    fn test_failing_action_does_not_stop_pass() {
        let fs = FakeFs::default();
        fs.set("/scene.json", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry
            .register("/scene.json", |_: &Path| -> ActionResult { Err("malformed scene".into()) })
            .unwrap();
        registry.register("/scene.json", recorder(&log, "ok")).unwrap();

        fs.set("/scene.json", 2);
        let report = registry.poll();

        assert_eq!(report.notified_count(), 2);
        assert_eq!(report.failures_of(FailureKind::Callback).count(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["ok"]);
        assert_eq!(registry.stats().failures, 1);
    }

    #[test]
    fn test_register_missing_path_leaves_registry_unchanged() {
        let fs = FakeFs::default();
        let mut registry = ResourceRegistry::with_reader(&fs);

        let err = registry.register("/missing.frag", |_| Ok(())).unwrap_err();
        assert!(matches!(err, ReloadError::NotFound(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_named_uses_resolver() {
        let fs = FakeFs::default();
        fs.set("/data/toy.frag", 1);
        let resolver = |name: &str| (name == "toy.frag").then(|| PathBuf::from("/data/toy.frag"));

        let mut registry = ResourceRegistry::with_reader(&fs);
        let handle = registry.register_named(&resolver, "toy.frag", |_| Ok(())).unwrap();
        assert_eq!(registry.get(handle).unwrap().path(), Path::new("/data/toy.frag"));

        let err = registry.register_named(&resolver, "other.frag", |_| Ok(())).unwrap_err();
        assert!(matches!(err, ReloadError::NotFound(p) if p == Path::new("other.frag")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_keeps_order() {
        let fs = FakeFs::default();
        fs.set("/x", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry.register("/x", recorder(&log, "1")).unwrap();
        let second = registry.register("/x", recorder(&log, "2")).unwrap();
        registry.register("/x", recorder(&log, "3")).unwrap();

        let removed = registry.unregister(second).unwrap();
        assert_eq!(removed.path(), Path::new("/x"));
        assert!(!registry.contains(second));
        assert!(matches!(
            registry.unregister(second),
            Err(ReloadError::UnknownHandle(h)) if h == second
        ));

        fs.set("/x", 2);
        registry.poll();
        assert_eq!(*log.lock().unwrap(), vec!["1", "3"]);
    }

    #[test]
    fn test_unregister_first_alias_does_not_refire_change() {
        let fs = FakeFs::default();
        fs.set("/shader.frag", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        let first = registry.register("/shader.frag", recorder(&log, "R1")).unwrap();
        let second = registry.register("/shader.frag", recorder(&log, "R2")).unwrap();

        fs.set("/shader.frag", 2);
        assert_eq!(registry.poll().notified_count(), 2);
        assert_eq!(
            registry.get(second).unwrap().last_modified(),
            registry.get(first).unwrap().last_modified()
        );

        registry.unregister(first).unwrap();
        assert_eq!(registry.poll().notified_count(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["R1", "R2"]);

        fs.set("/shader.frag", 3);
        let report = registry.poll();
        assert_eq!(report.notified_count(), 1);
        assert_eq!(report.notified[0].handle, second);
    }

    #[test]
    fn test_alias_baseline_survives_failed_read() {
        let fs = FakeFs::default();
        fs.set("/scene.json", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        let first = registry.register("/scene.json", recorder(&log, "A")).unwrap();
        registry.register("/scene.json", recorder(&log, "B")).unwrap();

        fs.fail("/scene.json");
        assert!(registry.poll().has_failures());

        fs.set("/scene.json", 1);
        registry.unregister(first).unwrap();
        assert_eq!(registry.poll().notified_count(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_trigger_skips_metadata() {
        let fs = FakeFs::default();
        fs.set("/a.frag", 1);
        fs.set("/b.frag", 1);
        let log = Log::default();

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry.register("/a.frag", recorder(&log, "a")).unwrap();
        registry.register("/b.frag", recorder(&log, "b")).unwrap();

        let before = fs.reads();
        let report = registry.trigger(Path::new("/a.frag"));
        assert_eq!(fs.reads(), before);
        assert_eq!(report.notified_count(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);

        // Baseline untouched: nothing pending on the next pass.
        assert_eq!(registry.poll().notified_count(), 0);
    }

    #[test]
    fn test_stats_and_paths() {
        let fs = FakeFs::default();
        fs.set("/a", 1);
        fs.set("/b", 1);

        let mut registry = ResourceRegistry::with_reader(&fs);
        registry.register("/a", |_| Ok(())).unwrap();
        registry.register("/b", |_| Ok(())).unwrap();
        registry.register("/a", |_| Ok(())).unwrap();

        assert_eq!(registry.paths(), vec![Path::new("/a"), Path::new("/b")]);

        fs.set("/a", 2);
        registry.poll();
        registry.poll();

        assert_eq!(
            registry.stats(),
            RegistryStats {
                total_entries: 3,
                unique_paths: 2,
                polls: 2,
                notifications: 2,
                failures: 0,
            }
        );
    }

    #[test]
    fn test_handles_are_distinct() {
        let fs = FakeFs::default();
        fs.set("/a", 1);

        let mut registry = ResourceRegistry::with_reader(&fs);
        let first = registry.register("/a", |_| Ok(())).unwrap();
        let second = registry.register("/a", |_| Ok(())).unwrap();

        assert_ne!(first, second);
        assert_eq!(registry.handles().collect::<Vec<_>>(), vec![first, second]);
        assert_eq!(first.to_string(), format!("#{}", first.as_raw()));
    }
}
