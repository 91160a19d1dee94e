//! Plain-text rendering of panes and the status line.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::app::App;
use crate::error::Result;
use crate::fs::snapshot::DirectoryEntry;
use crate::view::{Summary, ViewState};
use crate::watch::PaneId;

const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

/// Human-readable size: whole bytes below 1 KB, two decimals above.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    for unit in &UNITS[..UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} {}", size, UNITS[UNITS.len() - 1])
}

/// Modification time in local time.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// `Folders: n, Files: m, Selected: size`.
pub fn summary_line(summary: &Summary) -> String {
    format!(
        "Folders: {}, Files: {}, Selected: {}",
        summary.folders,
        summary.files,
        format_size(summary.selected_bytes)
    )
}

/// Header plus the visible rows of `pane`'s active tab.
pub fn render_pane(app: &mut App, pane: PaneId, use_icons: bool) -> String {
    let Some(state) = app.panes().get(pane.0) else {
        return String::new();
    };
    let focused = app.focus() == pane;
    let tab_count = state.tabs().len();
    let tab_index = state.active_index();
    let view_id = state.active().id();
    let live = app.is_watching(pane);

    // Icon lookups need `&mut App`; collect what the rows need first.
    let Some(view) = app.view(view_id) else {
        return String::new();
    };
    let header = format!(
        "{} {} [tab {}/{}]{}",
        if focused { '>' } else { ' ' },
        view.current_path().display(),
        tab_index + 1,
        tab_count,
        if live { "" } else { " (no live updates)" }
    );
    let rows: Vec<DirectoryEntry> = view
        .snapshot()
        .map(|s| {
            s.iter()
                .skip(view.scroll_top())
                .take(view.viewport_rows())
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let hidden_below = view
        .snapshot()
        .map_or(0, |s| s.len().saturating_sub(view.scroll_top() + rows.len()));
    let summary = summary_line(&view.summary());
    let selection = view.selection().clone();
    let children: Vec<PathBuf> = rows.iter().map(|e| view.child_path(&e.name)).collect();

    let mut out = vec![header];
    for (entry, child) in rows.iter().zip(&children) {
        out.push(entry_line(app, &selection, child, entry, use_icons));
    }
    if hidden_below > 0 {
        out.push(format!("  … {} more", hidden_below));
    }
    out.push(summary);
    out.join("\n")
}

fn entry_line(
    app: &mut App,
    selection: &BTreeSet<String>,
    child: &Path,
    entry: &DirectoryEntry,
    use_icons: bool,
) -> String {
    let mark = if selection.contains(&entry.name) {
        '*'
    } else {
        ' '
    };
    let cut = app.clipboard.is_cut(child);
    let indicator = if use_icons {
        app.icons.display_icon(child, entry.is_directory).0
    } else if entry.is_parent_link() {
        "[..]"
    } else if entry.is_directory {
        "[D] "
    } else {
        "[F] "
    };
    let size = if entry.is_directory {
        String::new()
    } else {
        format_size(entry.size_bytes)
    };
    let modified = if entry.is_parent_link() {
        String::new()
    } else {
        format_time(&entry.modified_at)
    };
    format!(
        "{}{}{:<40} {:>12}  {}{}",
        mark,
        indicator,
        entry.name,
        size,
        modified,
        if cut { "  (cut)" } else { "" }
    )
}

/// Every pane followed by the status line.
pub fn render(app: &mut App, use_icons: bool) -> String {
    app.clear_expired_status();
    let mut sections: Vec<String> = (0..app.panes().len())
        .map(|i| render_pane(app, PaneId(i), use_icons))
        .collect();
    sections.push(status_line(app));
    sections.join("\n\n")
}

/// Status message and clipboard state.
pub fn status_line(app: &App) -> String {
    let mut parts = Vec::new();
    if let Some((msg, _)) = &app.status_message {
        parts.push(msg.clone());
    }
    if let Some(clip) = app.clipboard.describe() {
        parts.push(format!("[{}]", clip));
    }
    if !app.watcher_active {
        parts.push("[live updates paused]".to_string());
    }
    parts.join("  ")
}

#[derive(Serialize)]
struct ViewReport<'a> {
    path: &'a Path,
    history: Vec<&'a Path>,
    entries: &'a [DirectoryEntry],
    selection: Vec<&'a str>,
    summary: Summary,
}

/// A view as pretty-printed JSON.
pub fn render_json(view: &ViewState) -> Result<String> {
    let report = ViewReport {
        path: view.current_path(),
        history: view.history().iter().collect(),
        entries: view.snapshot().map(|s| s.entries()).unwrap_or_default(),
        selection: view.selection().iter().map(String::as_str).collect(),
        summary: view.summary(),
    };
    Ok(serde_json::to_string_pretty(&report).map_err(io::Error::from)?)
}
