//! Navigation controller. The only code that changes a view's current
//! directory or edits its history.
//!
//! `plan_*` functions are cheap and run on the UI task; they return the
//! listing to perform, or `None` when the operation is a no-op. The
//! history is edited in [`commit`], only after the target was listed.

use std::path::PathBuf;

use crate::error::Result;
use crate::fs::paths;
use crate::fs::snapshot::{DirectorySnapshot, SnapshotOptions};
use crate::reconcile::{
    self, complete, execute, request_navigation, Applied, HistoryStep, Intent, ListingRequest,
};
use crate::view::ViewState;

/// Plan `NavigateTo(input)`. Re-navigating to the current directory is a
/// plain refresh and leaves the history alone.
pub fn plan_navigate(view: &mut ViewState, input: &str, options: SnapshotOptions) -> ListingRequest {
    let target = paths::resolve(input, view.current_path());
    plan_path(view, target, options, None)
}

/// Plan entering the child directory `name` of the current directory.
pub fn plan_enter(view: &mut ViewState, name: &str, options: SnapshotOptions) -> ListingRequest {
    let target = view.child_path(name);
    plan_path(view, target, options, None)
}

fn plan_path(
    view: &mut ViewState,
    target: PathBuf,
    options: SnapshotOptions,
    anchor: Option<String>,
) -> ListingRequest {
    if target == view.current_path {
        return reconcile::request_revisit(view, options);
    }
    request_navigation(view, target, HistoryStep::Push, options, anchor)
}

/// Plan `Up()`: `None` at a filesystem root.
pub fn plan_up(view: &mut ViewState, options: SnapshotOptions) -> Option<ListingRequest> {
    let parent = view.current_path().parent()?.to_path_buf();
    let anchor = view
        .current_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Some(plan_path(view, parent, options, anchor))
}

/// Plan `Back()`: `None` with fewer than two history entries.
pub fn plan_back(view: &mut ViewState, options: SnapshotOptions) -> Option<ListingRequest> {
    let target = view.history.back_target()?.to_path_buf();
    Some(request_navigation(view, target, HistoryStep::Back, options, None))
}

/// Plan `Forward()`: rotates the ring so its oldest entry becomes current.
/// `None` with fewer than two entries or when the oldest is the current
/// directory.
pub fn plan_forward(view: &mut ViewState, options: SnapshotOptions) -> Option<ListingRequest> {
    let target = view.history.forward_target()?.to_path_buf();
    if target == view.current_path {
        return None;
    }
    Some(request_navigation(view, target, HistoryStep::Forward, options, None))
}

/// Move `view` to a successfully listed navigation target.
pub(crate) fn commit(
    view: &mut ViewState,
    request: &ListingRequest,
    snapshot: DirectorySnapshot,
) -> Applied {
    match request.intent {
        Intent::Navigate(HistoryStep::Push) => view.history.push(request.path.clone()),
        Intent::Navigate(HistoryStep::Back) => view.history.step_back(),
        Intent::Navigate(HistoryStep::Forward) => view.history.step_forward(),
        Intent::Refresh | Intent::Revisit => {}
    }
    debug_assert_eq!(view.history.newest(), Some(request.path.as_path()));

    let from = std::mem::replace(&mut view.current_path, request.path.clone());
    view.selection.clear();
    view.scroll_top = request
        .anchor
        .as_deref()
        .and_then(|name| snapshot.position(name))
        .map(|pos| pos.saturating_sub(view.viewport_rows / 2))
        .unwrap_or(0);
    view.last_snapshot = Some(snapshot);
    log::info!("{} -> {}", from.display(), view.current_path.display());

    Applied::Navigated {
        from,
        to: view.current_path.clone(),
    }
}

fn run(view: &mut ViewState, request: Option<ListingRequest>) -> Result<Applied> {
    match request {
        Some(request) => complete(view, execute(request)),
        None => Ok(Applied::Unchanged),
    }
}

/// `NavigateTo(input)`, synchronously.
pub fn navigate_to(view: &mut ViewState, input: &str, options: SnapshotOptions) -> Result<Applied> {
    let request = plan_navigate(view, input, options);
    run(view, Some(request))
}

/// `Up()`, synchronously.
pub fn up(view: &mut ViewState, options: SnapshotOptions) -> Result<Applied> {
    let request = plan_up(view, options);
    run(view, request)
}

/// `Back()`, synchronously.
pub fn back(view: &mut ViewState, options: SnapshotOptions) -> Result<Applied> {
    let request = plan_back(view, options);
    run(view, request)
}

/// `Forward()`, synchronously.
pub fn forward(view: &mut ViewState, options: SnapshotOptions) -> Result<Applied> {
    let request = plan_forward(view, options);
    run(view, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::view::{ViewId, DEFAULT_HISTORY_CAPACITY};
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::TempDir;

    fn opts() -> SnapshotOptions {
        SnapshotOptions::default()
    }

    fn setup() -> (TempDir, ViewState) {
        let dir = TempDir::new().unwrap();
        for i in 0..12 {
            fs::create_dir(dir.path().join(format!("d{}", i))).unwrap();
        }
        File::create(dir.path().join("file.txt")).unwrap();
        let mut view = ViewState::new(ViewId(7), dir.path().to_path_buf(), DEFAULT_HISTORY_CAPACITY);
        reconcile::refresh(&mut view, opts()).unwrap();
        (dir, view)
    }

    fn history_of(view: &ViewState) -> Vec<PathBuf> {
        view.history().iter().map(Path::to_path_buf).collect()
    }

    #[test]
    fn navigate_pushes_history_and_lists() {
        let (dir, mut view) = setup();
        let applied = navigate_to(&mut view, "d1", opts()).unwrap();
        assert_eq!(
            applied,
            Applied::Navigated {
                from: dir.path().to_path_buf(),
                to: dir.path().join("d1"),
            }
        );
        assert_eq!(view.current_path(), dir.path().join("d1"));
        assert_eq!(view.history().len(), 2);
        assert!(view.snapshot().unwrap().is_empty());
    }

    #[test]
    fn history_keeps_ten_most_recent() {
        let (dir, mut view) = setup();
        for i in 0..11 {
            let target = dir.path().join(format!("d{}", i));
            navigate_to(&mut view, target.to_str().unwrap(), opts()).unwrap();
        }
        let expected: Vec<PathBuf> = (1..11).map(|i| dir.path().join(format!("d{}", i))).collect();
        assert_eq!(history_of(&view), expected);
    }

    #[test]
    fn renavigating_current_path_only_refreshes() {
        let (dir, mut view) = setup();
        navigate_to(&mut view, "d2", opts()).unwrap();
        let before = history_of(&view);
        File::create(dir.path().join("d2").join("new.txt")).unwrap();

        let applied = navigate_to(&mut view, ".", opts()).unwrap();
        assert!(matches!(applied, Applied::Refreshed(_)));
        assert_eq!(history_of(&view), before);
        assert!(view.snapshot().unwrap().contains("new.txt"));
    }

    #[test]
    fn unreadable_target_leaves_state_intact() {
        let (dir, mut view) = setup();
        let before = history_of(&view);
        let err = navigate_to(&mut view, "file.txt", opts()).unwrap_err();
        assert!(matches!(err, AppError::PathNotReadable { .. }));
        assert_eq!(view.current_path(), dir.path());
        assert_eq!(history_of(&view), before);
        assert!(!view.is_navigating());
    }

    #[test]
    fn missing_target_is_not_found() {
        let (dir, mut view) = setup();
        let err = navigate_to(&mut view, "nope", opts()).unwrap_err();
        assert!(matches!(err, AppError::PathNotFound { ref path } if *path == dir.path().join("nope")));
        assert_eq!(view.current_path(), dir.path());
    }

    #[test]
    fn up_goes_to_parent_and_anchors_child() {
        let (dir, mut view) = setup();
        navigate_to(&mut view, "d11", opts()).unwrap();
        view.set_viewport_rows(2);
        up(&mut view, opts()).unwrap();
        assert_eq!(view.current_path(), dir.path());
        let pos = view.snapshot().unwrap().position("d11").unwrap();
        assert!(view.visible_names().contains(&"d11"));
        assert_eq!(view.scroll_top(), pos - 1);
    }

    #[test]
    fn up_at_root_is_noop() {
        let root = PathBuf::from("/");
        let mut view = ViewState::new(ViewId(1), root.clone(), 10);
        assert_eq!(up(&mut view, opts()).unwrap(), Applied::Unchanged);
        assert_eq!(view.current_path(), root);
    }

    #[test]
    fn renavigating_deleted_current_path_is_not_found() {
        let (dir, mut view) = setup();
        navigate_to(&mut view, "d4", opts()).unwrap();
        let before = history_of(&view);
        fs::remove_dir(dir.path().join("d4")).unwrap();

        let err = navigate_to(&mut view, ".", opts()).unwrap_err();
        assert!(matches!(err, AppError::PathNotFound { ref path } if *path == dir.path().join("d4")));
        assert_eq!(history_of(&view), before);
        assert!(!view.is_navigating());
    }

    #[test]
    fn back_returns_to_previous_and_drops_current() {
        let (dir, mut view) = setup();
        navigate_to(&mut view, "d1", opts()).unwrap();
        navigate_to(&mut view, "../d2", opts()).unwrap();
        back(&mut view, opts()).unwrap();
        assert_eq!(view.current_path(), dir.path().join("d1"));
        assert_eq!(
            history_of(&view),
            vec![dir.path().to_path_buf(), dir.path().join("d1")]
        );
    }

    #[test]
    fn back_with_single_entry_is_noop() {
        let (_dir, mut view) = setup();
        assert_eq!(back(&mut view, opts()).unwrap(), Applied::Unchanged);
        assert_eq!(view.history().len(), 1);
    }

    #[test]
    fn back_to_deleted_directory_fails_without_losing_history() {
        let (dir, mut view) = setup();
        navigate_to(&mut view, "d1", opts()).unwrap();
        navigate_to(&mut view, "../d2", opts()).unwrap();
        fs::remove_dir(dir.path().join("d1")).unwrap();
        let before = history_of(&view);
        assert!(matches!(back(&mut view, opts()), Err(AppError::PathNotFound { .. })));
        assert_eq!(history_of(&view), before);
        assert_eq!(view.current_path(), dir.path().join("d2"));
    }

    #[test]
    fn forward_cycles_to_oldest_entry() {
        let (dir, mut view) = setup();
        navigate_to(&mut view, "d1", opts()).unwrap();
        navigate_to(&mut view, "../d2", opts()).unwrap();

        forward(&mut view, opts()).unwrap();
        assert_eq!(view.current_path(), dir.path());
        assert_eq!(
            history_of(&view),
            vec![dir.path().join("d1"), dir.path().join("d2"), dir.path().to_path_buf()]
        );

        forward(&mut view, opts()).unwrap();
        assert_eq!(view.current_path(), dir.path().join("d1"));
        assert_eq!(view.history().len(), 3);
    }

    #[test]
    fn forward_with_single_entry_is_noop() {
        let (_dir, mut view) = setup();
        assert_eq!(forward(&mut view, opts()).unwrap(), Applied::Unchanged);
    }

    #[test]
    fn later_navigation_supersedes_pending_one() {
        let (dir, mut view) = setup();
        let first = plan_navigate(&mut view, "d1", opts());
        let second = plan_navigate(&mut view, "d2", opts());
        let second_done = execute(second);
        let first_done = execute(first);

        complete(&mut view, second_done).unwrap();
        assert_eq!(complete(&mut view, first_done).unwrap(), Applied::Stale);
        assert_eq!(view.current_path(), dir.path().join("d2"));
        assert_eq!(view.history().len(), 2);
    }

    #[test]
    fn navigation_clears_selection() {
        let (_dir, mut view) = setup();
        view.select("file.txt");
        navigate_to(&mut view, "d3", opts()).unwrap();
        assert!(view.selection().is_empty());
    }
}
