//! Reload actions that observe their target without owning it.
//!
//! A reload action usually mutates something owned elsewhere: a shader
//! object, a scene subtree, a texture. [`weak_action`] captures only a
//! [`Weak`] reference, so the registry never keeps the target alive. Once
//! the owner drops the target the action becomes a no-op.

use std::path::Path;
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::error::{ActionError, ActionResult};

/// Build an action that locks `target` and hands it to `reload`.
///
/// The action does nothing when the target has already been dropped. A
/// poisoned lock is reported as an action failure.
pub fn weak_action<T, F>(
    target: &Arc<Mutex<T>>,
    mut reload: F,
) -> impl FnMut(&Path) -> ActionResult + Send + 'static + use<T, F>
where
    T: Send + 'static,
    F: FnMut(&mut T, &Path) -> ActionResult + Send + 'static,
{
    let weak = Arc::downgrade(target);
    move |path: &Path| {
        let Some(target) = weak.upgrade() else {
            debug!("Reload target for {} is gone, skipping", path.display());
            return Ok(());
        };
        let mut guard = target.lock().map_err(|_| {
            ActionError::from(format!("reload target for {} is poisoned", path.display()))
        })?;
        reload(&mut *guard, path)
    }
}

/// Like [`weak_action`], for targets that need no locking.
pub fn weak_action_ref<T, F>(
    target: &Arc<T>,
    mut reload: F,
) -> impl FnMut(&Path) -> ActionResult + Send + 'static + use<T, F>
where
    T: Send + Sync + 'static,
    F: FnMut(&T, &Path) -> ActionResult + Send + 'static,
{
    let weak: Weak<T> = Arc::downgrade(target);
    move |path: &Path| match weak.upgrade() {
        Some(target) => reload(&*target, path),
        None => {
            debug!("Reload target for {} is gone, skipping", path.display());
            Ok(())
        }
    }
}
