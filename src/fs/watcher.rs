use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default capacity of the notice queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// What happened to a directory child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Deleted,
    Modified,
    Moved,
}

/// One change notification. `secondary` is set only for [`ChangeKind::Moved`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    pub primary: PathBuf,
    pub secondary: Option<PathBuf>,
}

impl ChangeNotice {
    pub fn new(kind: ChangeKind, primary: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            primary: primary.into(),
            secondary: None,
        }
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Moved,
            primary: from.into(),
            secondary: Some(to.into()),
        }
    }

    /// Whether this notice concerns `dir` itself or one of its immediate children.
    pub fn touches(&self, dir: &Path) -> bool {
        std::iter::once(&self.primary)
            .chain(self.secondary.as_ref())
            .any(|p| p == dir || p.parent() == Some(dir))
    }

    /// Status-bar text such as `"Created: /tmp/a.txt"`.
    pub fn describe(&self) -> String {
        match (self.kind, &self.secondary) {
            (ChangeKind::Moved, Some(to)) => format!(
                "Moved: {} -> {}",
                self.primary.display(),
                to.display()
            ),
            (kind, _) => {
                let label = match kind {
                    ChangeKind::Created => "Created",
                    ChangeKind::Deleted => "Deleted",
                    ChangeKind::Modified => "Modified",
                    ChangeKind::Moved => "Moved",
                };
                format!("{}: {}", label, self.primary.display())
            }
        }
    }
}

/// Map a raw `notify` event onto a [`ChangeNotice`]. Access events are dropped.
pub fn classify(event: &notify::Event) -> Option<ChangeNotice> {
    let first = event.paths.first()?.clone();
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            return match event.paths.get(1) {
                Some(to) => Some(ChangeNotice::moved(first, to.clone())),
                None => Some(ChangeNotice::new(ChangeKind::Modified, first)),
            };
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
        EventKind::Modify(_) | EventKind::Any => ChangeKind::Modified,
        EventKind::Access(_) | EventKind::Other => return None,
    };
    Some(ChangeNotice::new(kind, first))
}

// ── Bounded notice queue ─────────────────────────────────────────────────────

/// Producer half, handed to the watcher's delivery thread.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: mpsc::Sender<ChangeNotice>,
    overflow: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl ChangeSender {
    /// Enqueue without blocking. A full queue records an overflow instead,
    /// which the receiver reports as "refresh everything".
    pub fn send(&self, notice: ChangeNotice) {
        if !self.active.load(Ordering::Relaxed) {
            return;
        }
        match self.tx.try_send(notice) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.overflow.store(true, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Pause event forwarding (subscriptions stay in place).
    pub fn pause(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Resume event forwarding.
    pub fn resume(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    /// Check if the sender is currently forwarding events.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Notices drained together in one pass of the UI loop.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub notices: Vec<ChangeNotice>,
    /// Notices were dropped because the queue was full.
    pub overflowed: bool,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty() && !self.overflowed
    }
}

/// Consumer half, owned by the UI task.
#[derive(Debug)]
pub struct ChangeReceiver {
    rx: mpsc::Receiver<ChangeNotice>,
    overflow: Arc<AtomicBool>,
    debounce: Duration,
    pending: Vec<ChangeNotice>,
}

/// Create a bounded notice queue.
pub fn change_channel(capacity: usize, debounce: Duration) -> (ChangeSender, ChangeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let overflow = Arc::new(AtomicBool::new(false));
    let sender = ChangeSender {
        tx,
        overflow: overflow.clone(),
        active: Arc::new(AtomicBool::new(true)),
    };
    let receiver = ChangeReceiver {
        rx,
        overflow,
        debounce,
        pending: Vec::new(),
    };
    (sender, receiver)
}

impl ChangeReceiver {
    /// Wait for at least one notice, let the debounce window pass, then
    /// return everything queued so far as one batch.
    ///
    /// Cancel safe: notices already taken off the queue are kept for the
    /// next call. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ChangeBatch> {
        if self.pending.is_empty() && !self.overflow.load(Ordering::Relaxed) {
            let first = self.rx.recv().await?;
            self.pending.push(first);
        }
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }
        Some(self.take_ready())
    }

    /// Non-blocking drain of whatever is queued right now.
    pub fn try_recv(&mut self) -> Option<ChangeBatch> {
        let batch = self.take_ready();
        (!batch.is_empty()).then_some(batch)
    }

    fn take_ready(&mut self) -> ChangeBatch {
        while let Ok(notice) = self.rx.try_recv() {
            self.pending.push(notice);
        }
        ChangeBatch {
            notices: std::mem::take(&mut self.pending),
            overflowed: self.overflow.swap(false, Ordering::Relaxed),
        }
    }
}

// ── Change sources ───────────────────────────────────────────────────────────

/// Opaque token for one directory subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Something that can observe directories non-recursively.
pub trait ChangeSource {
    fn subscribe(&mut self, dir: &Path) -> Result<SubscriptionHandle>;
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

/// `notify`-backed change source shared by every pane.
///
/// The OS watcher is created on the first subscription and then kept for
/// the life of the process. Directories are reference counted so two panes
/// on the same directory share one OS watch.
pub struct NotifySource {
    sender: ChangeSender,
    watcher: Option<RecommendedWatcher>,
    watched: HashMap<PathBuf, usize>,
    handles: HashMap<SubscriptionHandle, PathBuf>,
    next_handle: u64,
}

impl NotifySource {
    pub fn new(sender: ChangeSender) -> Self {
        Self {
            sender,
            watcher: None,
            watched: HashMap::new(),
            handles: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Whether the OS watcher has been started.
    pub fn is_started(&self) -> bool {
        self.watcher.is_some()
    }

    /// Number of distinct directories currently watched.
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    fn start(&self) -> notify::Result<RecommendedWatcher> {
        let sender = self.sender.clone();
        notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                if let Some(notice) = classify(&event) {
                    sender.send(notice);
                }
            }
            // Watcher errors are non-fatal.
            Err(e) => log::warn!("watcher error: {}", e),
        })
    }
}

impl ChangeSource for NotifySource {
    fn subscribe(&mut self, dir: &Path) -> Result<SubscriptionHandle> {
        let failed = |source| AppError::WatchSubscriptionFailed {
            path: dir.to_path_buf(),
            source,
        };

        let watcher = match self.watcher.take() {
            Some(w) => w,
            None => {
                log::debug!("starting filesystem watcher");
                self.start().map_err(failed)?
            }
        };
        let watcher = self.watcher.insert(watcher);

        let count = self.watched.get(dir).copied().unwrap_or(0);
        if count == 0 {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(failed)?;
        }
        self.watched.insert(dir.to_path_buf(), count + 1);

        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(handle, dir.to_path_buf());
        log::debug!("subscribed {:?} to {}", handle, dir.display());
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        let Some(dir) = self.handles.remove(&handle) else {
            return;
        };
        let remaining = match self.watched.get_mut(&dir) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => return,
        };
        if remaining == 0 {
            self.watched.remove(&dir);
            if let Some(watcher) = self.watcher.as_mut() {
                if let Err(e) = watcher.unwatch(&dir) {
                    log::debug!("unwatch {} failed: {}", dir.display(), e);
                }
            }
        }
        log::debug!("unsubscribed {:?} from {}", handle, dir.display());
    }
}
