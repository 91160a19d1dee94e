//! Per-tab view state: current directory, navigation history, the last
//! rendered snapshot, selection and scroll position.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::fs::snapshot::DirectorySnapshot;

/// Default history capacity.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Default number of rows assumed visible until the front end reports one.
pub const DEFAULT_VIEWPORT_ROWS: usize = 30;

/// Bounded, oldest-first ring of visited directories.
///
/// The newest entry is always the view's current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: VecDeque<PathBuf>,
    capacity: usize,
}

impl NavigationHistory {
    pub fn new(initial: PathBuf, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = VecDeque::with_capacity(capacity);
        entries.push_back(initial);
        Self { entries, capacity }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn newest(&self) -> Option<&Path> {
        self.entries.back().map(PathBuf::as_path)
    }

    pub fn oldest(&self) -> Option<&Path> {
        self.entries.front().map(PathBuf::as_path)
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, path: PathBuf) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(path);
    }

    /// Where `Back` would go: the entry just before the newest.
    pub fn back_target(&self) -> Option<&Path> {
        let len = self.entries.len();
        if len <= 1 {
            return None;
        }
        self.entries.get(len - 2).map(PathBuf::as_path)
    }

    /// Drop the newest entry, making the previous one current.
    pub fn step_back(&mut self) {
        if self.entries.len() > 1 {
            self.entries.pop_back();
        }
    }

    /// Where `Forward` would go: the oldest entry.
    pub fn forward_target(&self) -> Option<&Path> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.oldest()
    }

    /// Rotate the oldest entry round to the newest position.
    pub fn step_forward(&mut self) {
        if self.entries.len() > 1 {
            self.entries.rotate_left(1);
        }
    }
}

/// Stable identity of one open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ViewId(pub u64);

/// Derived aggregate shown in the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub folders: usize,
    pub files: usize,
    pub selected: usize,
    /// Total size of the selected files.
    pub selected_bytes: u64,
}

/// Compute the summary of `snapshot` under `selection`. The `..` entry is
/// not counted.
pub fn summarize(snapshot: &DirectorySnapshot, selection: &BTreeSet<String>) -> Summary {
    let mut summary = Summary::default();
    for entry in snapshot.iter().filter(|e| !e.is_parent_link()) {
        if entry.is_directory {
            summary.folders += 1;
        } else {
            summary.files += 1;
        }
        if selection.contains(&entry.name) {
            summary.selected += 1;
            summary.selected_bytes += entry.size_bytes;
        }
    }
    summary
}

/// One open tab.
///
/// Mutated only on the UI task. `current_path` changes only through the
/// navigation controller.
#[derive(Debug)]
pub struct ViewState {
    id: ViewId,
    pub(crate) current_path: PathBuf,
    pub(crate) history: NavigationHistory,
    pub(crate) last_snapshot: Option<DirectorySnapshot>,
    pub(crate) selection: BTreeSet<String>,
    pub(crate) scroll_top: usize,
    pub(crate) viewport_rows: usize,
    /// Last listing ticket handed out.
    pub(crate) issued: u64,
    /// Ticket of the navigation still in flight, 0 when none.
    pub(crate) pending_nav: u64,
    /// Ticket of the last listing applied.
    pub(crate) applied: u64,
}

impl ViewState {
    /// A view on `path` with a one-entry history and no listing yet.
    pub fn new(id: ViewId, path: PathBuf, history_capacity: usize) -> Self {
        Self::with_history(id, NavigationHistory::new(path, history_capacity))
    }

    /// A view restored from a saved history; its newest entry is current.
    pub fn with_history(id: ViewId, history: NavigationHistory) -> Self {
        let current_path = history.newest().map(Path::to_path_buf).unwrap_or_default();
        Self {
            id,
            current_path,
            history,
            last_snapshot: None,
            selection: BTreeSet::new(),
            scroll_top: 0,
            viewport_rows: DEFAULT_VIEWPORT_ROWS,
            issued: 0,
            pending_nav: 0,
            applied: 0,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    /// Last successfully applied listing, if any.
    pub fn snapshot(&self) -> Option<&DirectorySnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    /// Whether a navigation has been issued but not yet applied.
    pub fn is_navigating(&self) -> bool {
        self.pending_nav != 0
    }

    /// Index of the topmost visible row.
    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    pub fn set_viewport_rows(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
    }

    /// Scroll so that row `index` is the topmost visible row.
    pub fn scroll_to(&mut self, index: usize) {
        let len = self.last_snapshot.as_ref().map_or(0, DirectorySnapshot::len);
        self.scroll_top = index.min(len.saturating_sub(1));
    }

    /// Names of the rows currently on screen, top first.
    pub fn visible_names(&self) -> Vec<&str> {
        self.last_snapshot
            .as_ref()
            .map(|s| {
                s.iter()
                    .skip(self.scroll_top)
                    .take(self.viewport_rows)
                    .map(|e| e.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Absolute path of a child of the current directory.
    pub fn child_path(&self, name: &str) -> PathBuf {
        self.current_path.join(name)
    }

    // ── Selection ───────────────────────────────────────────────────────────

    /// Select `name` if it is a real entry of the current listing.
    pub fn select(&mut self, name: &str) -> bool {
        let selectable = self
            .last_snapshot
            .as_ref()
            .and_then(|s| s.get(name))
            .is_some_and(|e| !e.is_parent_link());
        if selectable {
            self.selection.insert(name.to_string());
        }
        selectable
    }

    pub fn deselect(&mut self, name: &str) -> bool {
        self.selection.remove(name)
    }

    pub fn toggle_selection(&mut self, name: &str) -> bool {
        if self.deselect(name) {
            false
        } else {
            self.select(name)
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        if let Some(snapshot) = &self.last_snapshot {
            self.selection = snapshot
                .iter()
                .filter(|e| !e.is_parent_link())
                .map(|e| e.name.clone())
                .collect();
        }
    }

    /// Replace the selection with every entry whose name contains `keyword`
    /// (case-insensitive). Returns the number selected.
    pub fn select_matching(&mut self, keyword: &str) -> usize {
        let needle = keyword.to_lowercase();
        self.selection.clear();
        if needle.is_empty() {
            return 0;
        }
        if let Some(snapshot) = &self.last_snapshot {
            self.selection = snapshot
                .iter()
                .filter(|e| !e.is_parent_link() && e.name.to_lowercase().contains(&needle))
                .map(|e| e.name.clone())
                .collect();
        }
        self.selection.len()
    }

    /// Absolute paths of the selection, in listing order.
    pub fn selected_paths(&self) -> Vec<PathBuf> {
        match &self.last_snapshot {
            Some(snapshot) => snapshot
                .iter()
                .filter(|e| self.selection.contains(&e.name))
                .map(|e| self.child_path(&e.name))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Aggregate for the status bar; recomputed on every call.
    pub fn summary(&self) -> Summary {
        self.last_snapshot
            .as_ref()
            .map(|s| summarize(s, &self.selection))
            .unwrap_or_default()
    }
}
