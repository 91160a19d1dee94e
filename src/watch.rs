//! Watch manager: keeps exactly one change subscription per visible pane,
//! pointed at that pane's active tab, and routes incoming notices to the
//! view that owns the subscription.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::watcher::{ChangeBatch, ChangeSource, SubscriptionHandle};
use crate::view::ViewId;

/// Index of a pane (0 = left, 1 = right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(pub usize);

#[derive(Debug)]
struct Binding {
    view: ViewId,
    path: PathBuf,
    /// `None` when subscribing failed; the pane then works without live updates.
    handle: Option<SubscriptionHandle>,
}

pub struct WatchManager {
    source: Box<dyn ChangeSource>,
    bindings: BTreeMap<PaneId, Binding>,
}

impl WatchManager {
    pub fn new(source: Box<dyn ChangeSource>) -> Self {
        Self {
            source,
            bindings: BTreeMap::new(),
        }
    }

    /// Point `pane`'s subscription at `path` on behalf of `view`.
    ///
    /// The previous subscription is dropped before the new one is made, so
    /// a pane never holds two. If the directory is unchanged only the owning
    /// view is updated. A failed subscription is returned as
    /// `WatchSubscriptionFailed` but the binding is still recorded so the
    /// next rebind retries.
    pub fn rebind(&mut self, pane: PaneId, view: ViewId, path: &Path) -> Result<()> {
        if let Some(binding) = self.bindings.get_mut(&pane) {
            if binding.path == path && binding.handle.is_some() {
                binding.view = view;
                return Ok(());
            }
        }

        self.release(pane);
        let (handle, outcome) = match self.source.subscribe(path) {
            Ok(handle) => (Some(handle), Ok(())),
            Err(e) => {
                log::warn!("{}", e);
                (None, Err(e))
            }
        };
        self.bindings.insert(
            pane,
            Binding {
                view,
                path: path.to_path_buf(),
                handle,
            },
        );
        outcome
    }

    /// Drop `pane`'s subscription entirely (the pane is going away).
    pub fn release(&mut self, pane: PaneId) {
        if let Some(old) = self.bindings.remove(&pane) {
            if let Some(handle) = old.handle {
                self.source.unsubscribe(handle);
            }
        }
    }

    /// The view and directory `pane` is bound to.
    pub fn binding(&self, pane: PaneId) -> Option<(ViewId, &Path)> {
        self.bindings
            .get(&pane)
            .map(|b| (b.view, b.path.as_path()))
    }

    /// Whether `pane` currently receives live updates.
    pub fn is_live(&self, pane: PaneId) -> bool {
        self.bindings
            .get(&pane)
            .is_some_and(|b| b.handle.is_some())
    }

    /// Views to reconcile for `batch`, each at most once.
    ///
    /// A notice counts only for panes whose bound directory it touches, so
    /// notices for a directory a pane has moved away from are dropped. An
    /// overflowed batch refreshes every live pane.
    pub fn route(&self, batch: &ChangeBatch) -> Vec<(PaneId, ViewId)> {
        let targets: Vec<(PaneId, ViewId)> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.handle.is_some())
            .filter(|(_, b)| batch.overflowed || batch.notices.iter().any(|n| n.touches(&b.path)))
            .map(|(pane, b)| (*pane, b.view))
            .collect();
        if targets.is_empty() && !batch.notices.is_empty() {
            log::debug!("ignoring {} notice(s) for unwatched paths", batch.notices.len());
        }
        targets
    }
}
