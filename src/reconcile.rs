//! Reconciliation engine: turns listing requests into snapshots and merges
//! them into a view without losing the user's selection or scroll position.
//!
//! A pass is split in two so the blocking directory read can run off the UI
//! task: [`execute`] does the I/O, [`complete`] applies the result.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::fs::snapshot::{build_snapshot, DirectorySnapshot, SnapshotOptions};
use crate::nav;
use crate::view::{summarize, Summary, ViewId, ViewState};

/// How a navigation edits the history once it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Push,
    Back,
    Forward,
}

/// Why a listing was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Re-list the current directory.
    Refresh,
    /// Re-list the current directory because the user navigated to it.
    /// Errors are reported like a navigation's.
    Revisit,
    /// Move the view to a new directory.
    Navigate(HistoryStep),
}

/// A directory read waiting to run.
#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub view: ViewId,
    /// Per-view sequence number, used to discard superseded results.
    pub ticket: u64,
    pub path: PathBuf,
    pub intent: Intent,
    pub options: SnapshotOptions,
    /// Entry to bring into view after a navigation.
    pub anchor: Option<String>,
}

/// A finished directory read.
#[derive(Debug)]
pub struct Listing {
    pub request: ListingRequest,
    pub result: Result<DirectorySnapshot>,
}

/// What applying a listing did to its view.
#[derive(Debug, PartialEq, Eq)]
pub enum Applied {
    Refreshed(ReconcileReport),
    Navigated { from: PathBuf, to: PathBuf },
    /// Superseded by a newer request; nothing changed.
    Stale,
    /// The operation had nothing to do (e.g. `Up` at a root).
    Unchanged,
}

/// Outcome of merging a snapshot into a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Selected names that no longer exist.
    pub dropped: Vec<String>,
    pub summary: Summary,
}

fn next_ticket(view: &mut ViewState) -> u64 {
    view.issued += 1;
    view.issued
}

/// Issue a refresh of the view's current directory.
pub fn request_refresh(view: &mut ViewState, options: SnapshotOptions) -> ListingRequest {
    ListingRequest {
        view: view.id(),
        ticket: next_ticket(view),
        path: view.current_path.clone(),
        intent: Intent::Refresh,
        options,
        anchor: None,
    }
}

/// Issue a refresh for an explicit navigation to the current directory.
/// It cancels any navigation still in flight.
pub(crate) fn request_revisit(view: &mut ViewState, options: SnapshotOptions) -> ListingRequest {
    view.pending_nav = 0;
    ListingRequest {
        intent: Intent::Revisit,
        ..request_refresh(view, options)
    }
}

/// Issue a navigation; it supersedes any navigation still in flight.
pub(crate) fn request_navigation(
    view: &mut ViewState,
    path: PathBuf,
    step: HistoryStep,
    options: SnapshotOptions,
    anchor: Option<String>,
) -> ListingRequest {
    let ticket = next_ticket(view);
    view.pending_nav = ticket;
    ListingRequest {
        view: view.id(),
        ticket,
        path,
        intent: Intent::Navigate(step),
        options,
        anchor,
    }
}

/// Perform the blocking I/O of a request.
pub fn execute(request: ListingRequest) -> Listing {
    let result = match request.intent {
        Intent::Refresh => build_snapshot(&request.path, request.options),
        Intent::Navigate(_) | Intent::Revisit => list_target(&request),
    };
    Listing { request, result }
}

/// List a navigation target, reporting errors in navigation terms.
fn list_target(request: &ListingRequest) -> Result<DirectorySnapshot> {
    let path = &request.path;
    if let Err(source) = fs::metadata(path) {
        return Err(if source.kind() == io::ErrorKind::NotFound {
            AppError::PathNotFound { path: path.clone() }
        } else {
            AppError::PathNotReadable {
                path: path.clone(),
                source,
            }
        });
    }
    build_snapshot(path, request.options).map_err(|e| match e {
        AppError::DirectoryUnreadable { path, source } => AppError::PathNotReadable { path, source },
        other => other,
    })
}

/// Apply a finished listing to its view.
///
/// Results that were superseded come back as [`Applied::Stale`]. Errors
/// leave the view exactly as it was.
pub fn complete(view: &mut ViewState, listing: Listing) -> Result<Applied> {
    let Listing { request, result } = listing;
    match request.intent {
        Intent::Navigate(_) => {
            if request.ticket != view.pending_nav {
                log::debug!(
                    "discarding superseded navigation to {}",
                    request.path.display()
                );
                return Ok(Applied::Stale);
            }
            view.pending_nav = 0;
            let snapshot = result?;
            view.applied = view.applied.max(request.ticket);
            Ok(nav::commit(view, &request, snapshot))
        }
        Intent::Refresh | Intent::Revisit => {
            if request.path != view.current_path || request.ticket <= view.applied {
                log::debug!("discarding stale listing of {}", request.path.display());
                return Ok(Applied::Stale);
            }
            let snapshot = result?;
            view.applied = request.ticket;
            Ok(Applied::Refreshed(reconcile(view, snapshot)))
        }
    }
}

/// Merge `snapshot` into `view`: keep selected names that still exist and
/// keep the topmost visible name that survived at the top of the viewport.
pub fn reconcile(view: &mut ViewState, snapshot: DirectorySnapshot) -> ReconcileReport {
    let dropped: Vec<String> = view
        .selection
        .iter()
        .filter(|name| !snapshot.get(name).is_some_and(|e| !e.is_parent_link()))
        .cloned()
        .collect();
    for name in &dropped {
        view.selection.remove(name);
    }

    view.scroll_top = view
        .visible_names()
        .into_iter()
        .find_map(|name| snapshot.position(name))
        .unwrap_or(0);

    let summary = summarize(&snapshot, &view.selection);
    view.last_snapshot = Some(snapshot);
    ReconcileReport { dropped, summary }
}

/// Refresh `view` synchronously.
pub fn refresh(view: &mut ViewState, options: SnapshotOptions) -> Result<Applied> {
    let request = request_refresh(view, options);
    complete(view, execute(request))
}
