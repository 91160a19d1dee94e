//! Composition root: panes and their tabs, the shared clipboard, the watch
//! manager and the mutation layer.
//!
//! `App` never blocks. Every operation returns the [`Job`]s it needs run;
//! the caller runs them off the UI task and hands each [`JobOutput`] back to
//! [`App::complete`], which may return follow-up jobs.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::error::{AppError, MutationKind, Result};
use crate::fs::clipboard::{ClipboardOp, ClipboardState};
use crate::fs::icons::IconCache;
use crate::fs::operations::{self, BatchOutcome, Trash};
use crate::fs::snapshot::{SnapshotOptions, PARENT_ENTRY};
use crate::fs::watcher::{ChangeBatch, ChangeSource};
use crate::nav;
use crate::reconcile::{self, Applied, Listing, ListingRequest};
use crate::view::{ViewId, ViewState};
use crate::watch::{PaneId, WatchManager};

/// How long a status message stays visible.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

/// Settings the core reads at runtime.
#[derive(Debug, Clone)]
pub struct Options {
    pub show_parent_entry: bool,
    pub history_capacity: usize,
    pub closed_tabs: usize,
    pub viewport_rows: usize,
    pub confirm_delete: bool,
}

impl From<&AppConfig> for Options {
    fn from(config: &AppConfig) -> Self {
        Self {
            show_parent_entry: config.show_parent_entry(),
            history_capacity: config.history_capacity(),
            closed_tabs: config.closed_tabs(),
            viewport_rows: config.viewport_rows(),
            confirm_delete: config.confirm_delete(),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl Options {
    fn snapshot(&self) -> SnapshotOptions {
        SnapshotOptions {
            include_parent: self.show_parent_entry,
        }
    }
}

// ── Panes ────────────────────────────────────────────────────────────────────

/// One side of the window: ordered tabs, the active one, and recently
/// closed tabs for reopening.
#[derive(Debug)]
pub struct Pane {
    tabs: Vec<ViewState>,
    active: usize,
    closed: VecDeque<ViewState>,
}

impl Pane {
    fn new(view: ViewState) -> Self {
        Self {
            tabs: vec![view],
            active: 0,
            closed: VecDeque::new(),
        }
    }

    pub fn tabs(&self) -> &[ViewState] {
        &self.tabs
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &ViewState {
        &self.tabs[self.active]
    }

    fn active_mut(&mut self) -> &mut ViewState {
        &mut self.tabs[self.active]
    }

    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }
}

// ── Jobs ─────────────────────────────────────────────────────────────────────

/// A filesystem mutation waiting to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateDirectory { dir: PathBuf, name: String },
    Rename { path: PathBuf, new_name: String },
    Delete { paths: Vec<PathBuf> },
    Copy { paths: Vec<PathBuf>, dest: PathBuf },
    Move { paths: Vec<PathBuf>, dest: PathBuf },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::CreateDirectory { .. } => MutationKind::CreateDirectory,
            Mutation::Rename { .. } => MutationKind::Rename,
            Mutation::Delete { .. } => MutationKind::Delete,
            Mutation::Copy { .. } => MutationKind::Copy,
            Mutation::Move { .. } => MutationKind::Move,
        }
    }

    /// Directories whose listings the mutation can change.
    fn affected_dirs(&self) -> Vec<PathBuf> {
        let parents = |paths: &[PathBuf]| -> Vec<PathBuf> {
            paths
                .iter()
                .filter_map(|p| p.parent().map(Path::to_path_buf))
                .collect()
        };
        let mut dirs = match self {
            Mutation::CreateDirectory { dir, .. } => vec![dir.clone()],
            Mutation::Rename { path, .. } => parents(std::slice::from_ref(path)),
            Mutation::Delete { paths } => parents(paths),
            Mutation::Copy { dest, .. } => vec![dest.clone()],
            Mutation::Move { paths, dest } => {
                let mut dirs = parents(paths);
                dirs.push(dest.clone());
                dirs
            }
        };
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

pub struct MutationJob {
    pub mutation: Mutation,
    /// View the user acted in.
    pub origin: ViewId,
    trash: Arc<dyn Trash>,
}

impl MutationJob {
    /// Perform the mutation. Blocking.
    pub fn run(self) -> MutationDone {
        let outcome = match &self.mutation {
            Mutation::CreateDirectory { dir, name } => {
                single(operations::create_directory(dir, name))
            }
            Mutation::Rename { path, new_name } => single(operations::rename_item(path, new_name)),
            Mutation::Delete { paths } => operations::delete_all(paths, self.trash.as_ref()),
            Mutation::Copy { paths, dest } => operations::copy_all(paths, dest),
            Mutation::Move { paths, dest } => operations::move_all(paths, dest),
        };
        MutationDone {
            mutation: self.mutation,
            origin: self.origin,
            outcome,
        }
    }
}

fn single(result: Result<PathBuf>) -> BatchOutcome {
    match result {
        Ok(path) => BatchOutcome {
            done: vec![path],
            error: None,
        },
        Err(e) => BatchOutcome {
            done: Vec::new(),
            error: Some(e),
        },
    }
}

/// A finished mutation.
#[derive(Debug)]
pub struct MutationDone {
    pub mutation: Mutation,
    pub origin: ViewId,
    pub outcome: BatchOutcome,
}

/// Blocking work requested by the UI task.
pub enum Job {
    List(ListingRequest),
    Mutate(MutationJob),
}

impl Job {
    /// Do the work. Blocking; run it on a worker thread.
    pub fn run(self) -> JobOutput {
        match self {
            Job::List(request) => JobOutput::Listed(reconcile::execute(request)),
            Job::Mutate(job) => JobOutput::Mutated(job.run()),
        }
    }
}

#[derive(Debug)]
pub enum JobOutput {
    Listed(Listing),
    Mutated(MutationDone),
}

/// What applying a job output produced.
#[derive(Default)]
pub struct Step {
    pub jobs: Vec<Job>,
    pub error: Option<AppError>,
}

/// Result of activating an entry.
pub enum Activation {
    /// A directory: listings to run.
    Jobs(Vec<Job>),
    /// A file to hand to the system opener.
    Open(PathBuf),
}

// ── App ──────────────────────────────────────────────────────────────────────

pub struct App {
    panes: Vec<Pane>,
    focus: usize,
    pub clipboard: ClipboardState,
    watch: Option<WatchManager>,
    trash: Arc<dyn Trash>,
    pub icons: IconCache,
    options: Options,
    next_view: u64,
    pending_delete: Option<Vec<PathBuf>>,
    /// Whether live updates are applied.
    pub watcher_active: bool,
    pub status_message: Option<(String, Instant)>,
    pub should_quit: bool,
}

impl App {
    /// One pane per path (left first). At least one pane is always created.
    pub fn new(paths: &[PathBuf], options: Options, trash: Arc<dyn Trash>) -> Self {
        let mut app = Self {
            panes: Vec::new(),
            focus: 0,
            clipboard: ClipboardState::new(),
            watch: None,
            trash,
            icons: IconCache::default(),
            options,
            next_view: 1,
            pending_delete: None,
            watcher_active: false,
            status_message: None,
            should_quit: false,
        };
        let mut paths = paths.to_vec();
        if paths.is_empty() {
            paths.push(dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")));
        }
        for path in paths {
            let view = app.new_view(path);
            app.panes.push(Pane::new(view));
        }
        app
    }

    /// Enable live updates through `source`.
    pub fn with_watch(mut self, source: Box<dyn ChangeSource>) -> Self {
        self.watch = Some(WatchManager::new(source));
        self.watcher_active = true;
        self
    }

    /// Bind every pane and issue the first listings.
    pub fn start(&mut self) -> Vec<Job> {
        let opts = self.options.snapshot();
        let mut jobs = Vec::new();
        for index in 0..self.panes.len() {
            self.bind(index);
            let view = self.panes[index].active_mut();
            jobs.push(Job::List(reconcile::request_refresh(view, opts)));
        }
        jobs
    }

    fn new_view(&mut self, path: PathBuf) -> ViewState {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        let mut view = ViewState::new(id, path, self.options.history_capacity);
        view.set_viewport_rows(self.options.viewport_rows);
        view
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn focus(&self) -> PaneId {
        PaneId(self.focus)
    }

    /// `GetSnapshot`-style access to the focused pane's active tab.
    pub fn focused_view(&self) -> &ViewState {
        self.panes[self.focus].active()
    }

    fn focused_view_mut(&mut self) -> &mut ViewState {
        self.panes[self.focus].active_mut()
    }

    /// Pane and tab index of an open view.
    fn locate(&self, id: ViewId) -> Option<(usize, usize)> {
        self.panes.iter().enumerate().find_map(|(p, pane)| {
            pane.tabs
                .iter()
                .position(|v| v.id() == id)
                .map(|t| (p, t))
        })
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewState> {
        self.locate(id).map(|(p, t)| &self.panes[p].tabs[t])
    }

    fn view_mut(&mut self, id: ViewId) -> Option<&mut ViewState> {
        self.locate(id).map(|(p, t)| &mut self.panes[p].tabs[t])
    }

    pub fn is_watching(&self, pane: PaneId) -> bool {
        self.watch.as_ref().is_some_and(|w| w.is_live(pane))
    }

    // ── Status ──────────────────────────────────────────────────────────────

    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Drop the status message once it is older than [`STATUS_TTL`].
    pub fn clear_expired_status(&mut self) {
        if let Some((_, created)) = &self.status_message {
            if created.elapsed() >= STATUS_TTL {
                self.status_message = None;
            }
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    fn fail(&mut self, error: AppError) -> Step {
        self.set_status_message(format!("✗ {}", error));
        Step {
            jobs: Vec::new(),
            error: Some(error),
        }
    }

    // ── Watch binding ───────────────────────────────────────────────────────

    /// Point `pane`'s subscription at its active tab.
    fn bind(&mut self, pane: usize) {
        let view = self.panes[pane].active();
        let (id, path) = (view.id(), view.current_path().to_path_buf());
        let Some(watch) = self.watch.as_mut() else {
            return;
        };
        if let Err(e) = watch.rebind(PaneId(pane), id, &path) {
            self.set_status_message(format!("⚠ Live updates unavailable: {}", e));
        }
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    pub fn navigate(&mut self, input: &str) -> Vec<Job> {
        let opts = self.options.snapshot();
        vec![Job::List(nav::plan_navigate(
            self.focused_view_mut(),
            input,
            opts,
        ))]
    }

    pub fn up(&mut self) -> Vec<Job> {
        let opts = self.options.snapshot();
        nav::plan_up(self.focused_view_mut(), opts)
            .map(Job::List)
            .into_iter()
            .collect()
    }

    pub fn back(&mut self) -> Vec<Job> {
        let opts = self.options.snapshot();
        nav::plan_back(self.focused_view_mut(), opts)
            .map(Job::List)
            .into_iter()
            .collect()
    }

    pub fn forward(&mut self) -> Vec<Job> {
        let opts = self.options.snapshot();
        nav::plan_forward(self.focused_view_mut(), opts)
            .map(Job::List)
            .into_iter()
            .collect()
    }

    /// Open `name` in the focused view: directories are entered, `..` goes
    /// up, files are returned for the system opener.
    pub fn activate(&mut self, name: &str) -> Result<Activation> {
        if name == PARENT_ENTRY {
            return Ok(Activation::Jobs(self.up()));
        }
        let view = self.focused_view();
        let path = view.child_path(name);
        let is_directory = match view.snapshot().and_then(|s| s.get(name)) {
            Some(entry) => entry.is_directory,
            None => return Err(AppError::PathNotFound { path }),
        };
        if !is_directory {
            return Ok(Activation::Open(path));
        }
        let opts = self.options.snapshot();
        Ok(Activation::Jobs(vec![Job::List(nav::plan_enter(
            self.focused_view_mut(),
            name,
            opts,
        ))]))
    }

    // ── Refresh ─────────────────────────────────────────────────────────────

    pub fn refresh(&mut self) -> Vec<Job> {
        let opts = self.options.snapshot();
        vec![Job::List(reconcile::request_refresh(
            self.focused_view_mut(),
            opts,
        ))]
    }

    /// Refresh every tab of every pane.
    pub fn refresh_all(&mut self) -> Vec<Job> {
        let opts = self.options.snapshot();
        self.panes
            .iter_mut()
            .flat_map(|pane| pane.tabs.iter_mut())
            .map(|view| Job::List(reconcile::request_refresh(view, opts)))
            .collect()
    }

    /// `OnExternalChange(view)`: the view's watched directory changed.
    pub fn on_external_change(&mut self, id: ViewId) -> Vec<Job> {
        let opts = self.options.snapshot();
        match self.view_mut(id) {
            Some(view) => vec![Job::List(reconcile::request_refresh(view, opts))],
            None => {
                log::debug!("change for closed view {:?} ignored", id);
                Vec::new()
            }
        }
    }

    /// Route a drained batch of change notices to the views that own them.
    pub fn handle_changes(&mut self, batch: ChangeBatch) -> Vec<Job> {
        if !self.watcher_active {
            return Vec::new();
        }
        let Some(watch) = self.watch.as_ref() else {
            return Vec::new();
        };
        let targets = watch.route(&batch);
        if targets.is_empty() {
            return Vec::new();
        }
        if batch.overflowed {
            self.set_status_message("Many changes detected, refreshing".to_string());
        } else if let Some(last) = batch.notices.last() {
            self.set_status_message(last.describe());
        }
        targets
            .into_iter()
            .flat_map(|(_, view)| self.on_external_change(view))
            .collect()
    }

    /// Directories whose open views need re-listing.
    fn refresh_dirs(&mut self, dirs: &[PathBuf]) -> Vec<Job> {
        let opts = self.options.snapshot();
        self.panes
            .iter_mut()
            .flat_map(|pane| pane.tabs.iter_mut())
            .filter(|view| dirs.iter().any(|d| d == view.current_path()))
            .map(|view| Job::List(reconcile::request_refresh(view, opts)))
            .collect()
    }

    // ── Completion ──────────────────────────────────────────────────────────

    /// Apply a finished job.
    pub fn complete(&mut self, output: JobOutput) -> Step {
        match output {
            JobOutput::Listed(listing) => match self.complete_listing(listing) {
                Ok(()) => Step::default(),
                Err(e) => self.fail(e),
            },
            JobOutput::Mutated(done) => self.complete_mutation(done),
        }
    }

    fn complete_listing(&mut self, listing: Listing) -> Result<()> {
        let Some((p, t)) = self.locate(listing.request.view) else {
            log::debug!(
                "discarding listing of {} for a closed tab",
                listing.request.path.display()
            );
            return Ok(());
        };
        match reconcile::complete(&mut self.panes[p].tabs[t], listing)? {
            Applied::Navigated { .. } if t == self.panes[p].active => self.bind(p),
            Applied::Refreshed(report) if !report.dropped.is_empty() => {
                log::debug!("selection lost {:?}", report.dropped);
            }
            _ => {}
        }
        Ok(())
    }

    fn complete_mutation(&mut self, done: MutationDone) -> Step {
        let MutationDone {
            mutation,
            origin,
            outcome,
        } = done;

        if let (Mutation::Rename { .. }, Some(new_path)) = (&mutation, outcome.done.first()) {
            let new_name = new_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            if let (Some(name), Some(view)) = (new_name, self.view_mut(origin)) {
                view.selection.clear();
                view.selection.insert(name);
            }
        }

        log::info!("{}: {} item(s) done", mutation.kind(), outcome.done.len());
        let jobs = self.refresh_dirs(&mutation.affected_dirs());
        match outcome.error {
            Some(error) => {
                self.set_status_message(format!("✗ {}", error));
                Step {
                    jobs,
                    error: Some(error),
                }
            }
            None => {
                let count = outcome.done.len();
                let msg = match mutation {
                    Mutation::CreateDirectory { name, .. } => format!("✓ Created {}", name),
                    Mutation::Rename { new_name, .. } => format!("✓ Renamed to {}", new_name),
                    Mutation::Delete { .. } => format!("✓ Moved {} item(s) to trash", count),
                    Mutation::Copy { .. } => format!("✓ Copied {} item(s)", count),
                    Mutation::Move { .. } => format!("✓ Moved {} item(s)", count),
                };
                self.set_status_message(msg);
                Step { jobs, error: None }
            }
        }
    }

    // ── Selection ───────────────────────────────────────────────────────────

    /// Select the named entries; returns how many were selectable.
    pub fn select(&mut self, names: &[&str]) -> usize {
        let view = self.focused_view_mut();
        names.iter().filter(|name| view.select(name)).count()
    }

    pub fn toggle(&mut self, name: &str) -> bool {
        self.focused_view_mut().toggle_selection(name)
    }

    pub fn select_all(&mut self) {
        self.focused_view_mut().select_all();
    }

    pub fn select_matching(&mut self, keyword: &str) -> usize {
        self.focused_view_mut().select_matching(keyword)
    }

    pub fn clear_selection(&mut self) {
        self.focused_view_mut().clear_selection();
    }

    pub fn scroll_to(&mut self, row: usize) {
        self.focused_view_mut().scroll_to(row);
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    fn mutate(&mut self, mutation: Mutation) -> Vec<Job> {
        vec![Job::Mutate(MutationJob {
            mutation,
            origin: self.focused_view().id(),
            trash: self.trash.clone(),
        })]
    }

    /// Selected paths, or a status note when nothing is selected.
    fn selection_or_note(&mut self) -> Option<Vec<PathBuf>> {
        let paths = self.focused_view().selected_paths();
        if paths.is_empty() {
            self.set_status_message("Nothing selected".to_string());
            return None;
        }
        Some(paths)
    }

    pub fn create_directory(&mut self, name: &str) -> Result<Vec<Job>> {
        let name = operations::validate_name(name)?.to_string();
        let dir = self.focused_view().current_path().to_path_buf();
        Ok(self.mutate(Mutation::CreateDirectory { dir, name }))
    }

    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<Vec<Job>> {
        let new_name = operations::validate_name(new_name)?.to_string();
        let view = self.focused_view();
        let path = view.child_path(name);
        let known = view
            .snapshot()
            .and_then(|s| s.get(name))
            .is_some_and(|e| !e.is_parent_link());
        if !known {
            return Err(AppError::PathNotFound { path });
        }
        Ok(self.mutate(Mutation::Rename { path, new_name }))
    }

    /// Move the selection to the trash, asking first when configured to.
    pub fn delete(&mut self) -> Vec<Job> {
        let Some(paths) = self.selection_or_note() else {
            return Vec::new();
        };
        if self.options.confirm_delete {
            self.set_status_message(format!("Move {} item(s) to trash? (y/n)", paths.len()));
            self.pending_delete = Some(paths);
            return Vec::new();
        }
        self.mutate(Mutation::Delete { paths })
    }

    pub fn has_pending_delete(&self) -> bool {
        self.pending_delete.is_some()
    }

    /// Answer the delete confirmation.
    pub fn confirm_delete(&mut self, yes: bool) -> Vec<Job> {
        match self.pending_delete.take() {
            Some(paths) if yes => self.mutate(Mutation::Delete { paths }),
            Some(_) => {
                self.set_status_message("Delete cancelled".to_string());
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub fn copy(&mut self) -> usize {
        self.fill_clipboard(ClipboardOp::Copy)
    }

    pub fn cut(&mut self) -> usize {
        self.fill_clipboard(ClipboardOp::Cut)
    }

    fn fill_clipboard(&mut self, op: ClipboardOp) -> usize {
        let Some(paths) = self.selection_or_note() else {
            return 0;
        };
        let count = paths.len();
        self.clipboard.set(paths, op);
        if let Some(desc) = self.clipboard.describe() {
            self.set_status_message(desc);
        }
        count
    }

    /// Paste the clipboard into the focused view's directory. The clipboard
    /// is left as is, so the same set can be pasted again.
    pub fn paste(&mut self) -> Result<Vec<Job>> {
        let Some(op) = self.clipboard.operation().filter(|_| !self.clipboard.is_empty()) else {
            self.set_status_message("Clipboard is empty".to_string());
            return Ok(Vec::new());
        };
        let dest = self.focused_view().current_path().to_path_buf();
        let paths = self.clipboard.paths().to_vec();
        let kind = match op {
            ClipboardOp::Copy => MutationKind::Copy,
            ClipboardOp::Cut => MutationKind::Move,
        };
        // Lexical only; the job refuses nesting again against the disk.
        if let Some(inner) = paths.iter().find(|p| dest.starts_with(p)) {
            return Err(AppError::mutation(
                kind,
                inner,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "cannot paste a directory into itself",
                ),
            ));
        }
        let mutation = match op {
            ClipboardOp::Copy => Mutation::Copy { paths, dest },
            ClipboardOp::Cut => Mutation::Move { paths, dest },
        };
        Ok(self.mutate(mutation))
    }

    // ── Tabs and panes ──────────────────────────────────────────────────────

    /// Rebind the focused pane to its (new) active tab and re-list it.
    fn on_tab_changed(&mut self) -> Vec<Job> {
        self.bind(self.focus);
        self.refresh()
    }

    /// Open a tab in the focused pane at the current directory, then move
    /// it to `input` if given.
    pub fn new_tab(&mut self, input: Option<&str>) -> Vec<Job> {
        let path = self.focused_view().current_path().to_path_buf();
        let view = self.new_view(path);
        let pane = &mut self.panes[self.focus];
        pane.tabs.push(view);
        pane.active = pane.tabs.len() - 1;

        let mut jobs = self.on_tab_changed();
        if let Some(input) = input {
            jobs.extend(self.navigate(input));
        }
        jobs
    }

    /// Close the focused pane's active tab. The last tab never closes.
    pub fn close_tab(&mut self) -> Vec<Job> {
        let capacity = self.options.closed_tabs;
        let pane = &mut self.panes[self.focus];
        if pane.tabs.len() <= 1 {
            self.set_status_message("Cannot close the last tab".to_string());
            return Vec::new();
        }
        let mut view = pane.tabs.remove(pane.active);
        pane.active = pane.active.min(pane.tabs.len() - 1);
        view.pending_nav = 0;
        if capacity > 0 {
            if pane.closed.len() >= capacity {
                pane.closed.pop_front();
            }
            pane.closed.push_back(view);
        }
        self.on_tab_changed()
    }

    /// Bring back the most recently closed tab of the focused pane.
    pub fn reopen_tab(&mut self) -> Vec<Job> {
        let pane = &mut self.panes[self.focus];
        let Some(view) = pane.closed.pop_back() else {
            self.set_status_message("No closed tabs".to_string());
            return Vec::new();
        };
        pane.tabs.push(view);
        pane.active = pane.tabs.len() - 1;
        self.on_tab_changed()
    }

    pub fn switch_tab(&mut self, index: usize) -> Vec<Job> {
        let pane = &mut self.panes[self.focus];
        if index >= pane.tabs.len() {
            self.set_status_message(format!("No tab {}", index + 1));
            return Vec::new();
        }
        if index == pane.active {
            return Vec::new();
        }
        pane.active = index;
        self.on_tab_changed()
    }

    pub fn focus_pane(&mut self, pane: PaneId) {
        if pane.0 < self.panes.len() {
            self.focus = pane.0;
        } else {
            self.set_status_message(format!("No pane {}", pane.0 + 1));
        }
    }

    /// Move focus to the other pane.
    pub fn toggle_focus(&mut self) {
        self.focus = (self.focus + 1) % self.panes.len();
    }

    /// Run `jobs` and all their follow-ups on the calling thread. Returns
    /// the errors reported along the way.
    pub fn run_blocking(&mut self, jobs: Vec<Job>) -> Vec<AppError> {
        let mut queue: VecDeque<Job> = jobs.into();
        let mut errors = Vec::new();
        while let Some(job) = queue.pop_front() {
            let step = self.complete(job.run());
            queue.extend(step.jobs);
            errors.extend(step.error);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fs::operations::DirTrash;
    use crate::fs::watcher::{ChangeKind, ChangeNotice, SubscriptionHandle};
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn options() -> Options {
        Options {
            show_parent_entry: false,
            confirm_delete: false,
            ..Options::default()
        }
    }

    fn setup(paths: &[PathBuf]) -> (TempDir, App) {
        let bin = TempDir::new().unwrap();
        let trash = Arc::new(DirTrash::new(bin.path()));
        let mut app = App::new(paths, options(), trash);
        let jobs = app.start();
        assert!(app.run_blocking(jobs).is_empty());
        (bin, app)
    }

    fn names(view: &ViewState) -> Vec<String> {
        view.snapshot()
            .map(|s| s.names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Records subscriptions so tests can see which paths are watched.
    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<PathBuf>>>);

    impl ChangeSource for Recorder {
        fn subscribe(&mut self, dir: &Path) -> Result<SubscriptionHandle> {
            let mut live = self.0.borrow_mut();
            live.push(dir.to_path_buf());
            Ok(SubscriptionHandle(live.len() as u64))
        }

        fn unsubscribe(&mut self, _handle: SubscriptionHandle) {}
    }

    #[test]
    fn external_change_inserts_new_file_in_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::create_dir(tmp.path().join("A")).unwrap();
        fs::write(tmp.path().join("c.txt"), "c").unwrap();

        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        assert_eq!(names(app.focused_view()), ["A", "b.txt", "c.txt"]);

        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let id = app.focused_view().id();
        let jobs = app.on_external_change(id);
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(names(app.focused_view()), ["A", "a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn change_batch_refreshes_bound_view() {
        let tmp = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let bin = TempDir::new().unwrap();
        let mut app = App::new(
            &[tmp.path().to_path_buf()],
            options(),
            Arc::new(DirTrash::new(bin.path())),
        )
        .with_watch(Box::new(recorder.clone()));
        let jobs = app.start();
        app.run_blocking(jobs);
        assert_eq!(*recorder.0.borrow(), vec![tmp.path().to_path_buf()]);

        fs::write(tmp.path().join("new.txt"), "").unwrap();
        let batch = ChangeBatch {
            notices: vec![ChangeNotice::new(
                ChangeKind::Created,
                tmp.path().join("new.txt"),
            )],
            overflowed: false,
        };
        let jobs = app.handle_changes(batch);
        assert_eq!(jobs.len(), 1);
        app.run_blocking(jobs);
        assert_eq!(names(app.focused_view()), ["new.txt"]);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.starts_with("Created: "));
    }

    #[test]
    fn paused_watcher_ignores_changes() {
        let tmp = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let mut app = App::new(
            &[tmp.path().to_path_buf()],
            options(),
            Arc::new(DirTrash::new(bin.path())),
        )
        .with_watch(Box::new(Recorder::default()));
        let jobs = app.start();
        app.run_blocking(jobs);
        app.watcher_active = false;
        let batch = ChangeBatch {
            notices: vec![],
            overflowed: true,
        };
        assert!(app.handle_changes(batch).is_empty());
    }

    #[test]
    fn paste_copies_into_other_pane_and_keeps_clipboard() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        fs::write(left.path().join("f"), "data").unwrap();

        let (_bin, mut app) = setup(&[left.path().to_path_buf(), right.path().to_path_buf()]);
        assert_eq!(app.select(&["f"]), 1);
        assert_eq!(app.copy(), 1);

        app.focus_pane(PaneId(1));
        let jobs = app.paste().unwrap();
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(names(app.focused_view()), ["f"]);
        assert_eq!(fs::read_to_string(right.path().join("f")).unwrap(), "data");
        assert_eq!(app.clipboard.paths(), [left.path().join("f")]);
        assert_eq!(app.clipboard.operation(), Some(ClipboardOp::Copy));

        let jobs = app.paste().unwrap();
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(names(app.focused_view()), ["f", "f_copy"]);
    }

    #[test]
    fn cut_paste_refreshes_both_panes() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        fs::write(left.path().join("m.txt"), "").unwrap();

        let (_bin, mut app) = setup(&[left.path().to_path_buf(), right.path().to_path_buf()]);
        app.select(&["m.txt"]);
        app.cut();
        app.toggle_focus();
        let jobs = app.paste().unwrap();
        assert!(app.run_blocking(jobs).is_empty());

        assert!(names(app.panes()[0].active()).is_empty());
        assert_eq!(names(app.panes()[1].active()), ["m.txt"]);
    }

    #[test]
    fn pasting_directory_into_itself_is_refused() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("d")).unwrap();

        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        app.select(&["d"]);
        app.copy();
        let jobs = app.activate("d").unwrap();
        let Activation::Jobs(jobs) = jobs else {
            panic!("directory should navigate");
        };
        app.run_blocking(jobs);

        let err = app.paste().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MutationFailed);
    }

    #[test]
    fn mkdir_refreshes_every_view_on_that_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let (_bin, mut app) = setup(&[dir.clone(), dir]);

        let jobs = app.create_directory("fresh").unwrap();
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(names(app.panes()[0].active()), ["fresh"]);
        assert_eq!(names(app.panes()[1].active()), ["fresh"]);
    }

    #[test]
    fn mkdir_existing_reports_failure() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("x")).unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        let jobs = app.create_directory("x").unwrap();
        let errors = app.run_blocking(jobs);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::MutationFailed);
    }

    #[test]
    fn rename_selects_new_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("old.txt"), "").unwrap();
        fs::write(tmp.path().join("other.txt"), "").unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        app.select(&["other.txt"]);

        let jobs = app.rename("old.txt", "new.txt").unwrap();
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(names(app.focused_view()), ["new.txt", "other.txt"]);
        assert_eq!(
            app.focused_view().selection().iter().collect::<Vec<_>>(),
            ["new.txt"]
        );
    }

    #[test]
    fn rename_unknown_entry_fails_early() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        let err = app.rename("ghost", "x").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
    }

    #[test]
    fn delete_moves_selection_to_trash_after_confirmation() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a"), "").unwrap();
        fs::write(tmp.path().join("b"), "").unwrap();
        let bin = TempDir::new().unwrap();
        let mut app = App::new(
            &[tmp.path().to_path_buf()],
            Options {
                confirm_delete: true,
                ..options()
            },
            Arc::new(DirTrash::new(bin.path())),
        );
        let jobs = app.start();
        app.run_blocking(jobs);

        app.select(&["a"]);
        assert!(app.delete().is_empty());
        assert!(app.has_pending_delete());
        assert!(app.confirm_delete(false).is_empty());
        assert!(tmp.path().join("a").exists());

        app.delete();
        let jobs = app.confirm_delete(true);
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(names(app.focused_view()), ["b"]);
        assert_eq!(fs::read_dir(bin.path()).unwrap().count(), 1);
        assert!(app.focused_view().selection().is_empty());
    }

    #[test]
    fn delete_with_nothing_selected_is_a_note() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        assert!(app.delete().is_empty());
        assert!(!app.has_pending_delete());
    }

    #[test]
    fn failed_navigation_keeps_view() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        let jobs = app.navigate("missing");
        let errors = app.run_blocking(jobs);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::PathNotFound);
        assert_eq!(app.focused_view().current_path(), tmp.path());
        assert!(app.status_message.is_some());
    }

    #[test]
    fn activate_file_returns_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doc.txt"), "").unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        match app.activate("doc.txt").unwrap() {
            Activation::Open(path) => assert_eq!(path, tmp.path().join("doc.txt")),
            Activation::Jobs(_) => panic!("file should open"),
        }
    }

    #[test]
    fn activate_parent_entry_goes_up() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        let (_bin, mut app) = setup(&[tmp.path().join("sub")]);
        let Activation::Jobs(jobs) = app.activate(PARENT_ENTRY).unwrap() else {
            panic!("parent entry should navigate");
        };
        app.run_blocking(jobs);
        assert_eq!(app.focused_view().current_path(), tmp.path());
    }

    #[test]
    fn focusing_missing_pane_reports_it() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        app.focus_pane(PaneId(1));
        assert_eq!(app.focus(), PaneId(0));
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "No pane 2");
    }

    #[test]
    fn last_tab_never_closes() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        assert!(app.close_tab().is_empty());
        assert_eq!(app.panes()[0].tabs().len(), 1);
    }

    #[test]
    fn closed_tabs_reopen_last_in_first_out() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("one")).unwrap();
        fs::create_dir(tmp.path().join("two")).unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);

        let jobs = app.new_tab(Some("one"));
        app.run_blocking(jobs);
        let jobs = app.new_tab(Some("two"));
        app.run_blocking(jobs);
        assert_eq!(app.panes()[0].tabs().len(), 3);

        let jobs = app.close_tab();
        app.run_blocking(jobs);
        let jobs = app.switch_tab(1);
        app.run_blocking(jobs);
        let jobs = app.close_tab();
        app.run_blocking(jobs);
        assert_eq!(app.panes()[0].closed_count(), 2);

        let jobs = app.reopen_tab();
        app.run_blocking(jobs);
        assert_eq!(app.focused_view().current_path(), tmp.path().join("one"));
        let jobs = app.reopen_tab();
        app.run_blocking(jobs);
        assert_eq!(app.focused_view().current_path(), tmp.path().join("two"));
        assert!(app.reopen_tab().is_empty());
    }

    #[test]
    fn closed_tab_recall_is_bounded() {
        let tmp = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let mut app = App::new(
            &[tmp.path().to_path_buf()],
            Options {
                closed_tabs: 2,
                ..options()
            },
            Arc::new(DirTrash::new(bin.path())),
        );
        for _ in 0..4 {
            app.new_tab(None);
        }
        for _ in 0..4 {
            app.close_tab();
        }
        assert_eq!(app.panes()[0].closed_count(), 2);
    }

    #[test]
    fn switching_tabs_rebinds_the_pane() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("inner")).unwrap();
        let recorder = Recorder::default();
        let bin = TempDir::new().unwrap();
        let mut app = App::new(
            &[tmp.path().to_path_buf()],
            options(),
            Arc::new(DirTrash::new(bin.path())),
        )
        .with_watch(Box::new(recorder.clone()));
        let jobs = app.start();
        app.run_blocking(jobs);

        let jobs = app.new_tab(Some("inner"));
        app.run_blocking(jobs);
        let jobs = app.switch_tab(0);
        app.run_blocking(jobs);

        let subscribed = recorder.0.borrow().clone();
        assert_eq!(
            subscribed,
            vec![
                tmp.path().to_path_buf(),
                tmp.path().join("inner"),
                tmp.path().to_path_buf(),
            ]
        );
        assert!(app.is_watching(PaneId(0)));
    }

    #[test]
    fn listing_for_closed_tab_is_discarded() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        app.new_tab(None);
        let jobs = app.refresh();
        app.close_tab();
        assert!(app.run_blocking(jobs).is_empty());
        assert_eq!(app.panes()[0].tabs().len(), 1);
    }

    #[test]
    fn refresh_all_covers_every_tab() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf(), tmp.path().to_path_buf()]);
        app.new_tab(None);
        assert_eq!(app.refresh_all().len(), 3);
    }

    #[test]
    fn status_message_expires() {
        let tmp = TempDir::new().unwrap();
        let (_bin, mut app) = setup(&[tmp.path().to_path_buf()]);
        app.set_status_message("fresh".to_string());
        app.clear_expired_status();
        assert!(app.status_message.is_some());
        app.status_message = Some(("old".to_string(), Instant::now() - Duration::from_secs(5)));
        app.clear_expired_status();
        assert!(app.status_message.is_none());
    }
}
