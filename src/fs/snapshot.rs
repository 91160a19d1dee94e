use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};

/// Name of the synthetic entry that leads to the parent directory.
pub const PARENT_ENTRY: &str = "..";

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Base name only, never a full path.
    pub name: String,
    pub is_directory: bool,
    /// Always 0 for directories.
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

impl DirectoryEntry {
    /// Whether this is the synthetic `..` entry.
    pub fn is_parent_link(&self) -> bool {
        self.name == PARENT_ENTRY
    }

    fn from_metadata(name: String, metadata: &fs::Metadata) -> Self {
        let is_directory = metadata.is_dir();
        Self {
            name,
            is_directory,
            size_bytes: if is_directory { 0 } else { metadata.len() },
            modified_at: to_seconds(metadata.modified().ok()),
        }
    }
}

/// Truncate a filesystem timestamp to whole seconds.
fn to_seconds(time: Option<SystemTime>) -> DateTime<Utc> {
    let secs = time
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Ordering used by every snapshot: `..` first, directories before files,
/// then case-insensitive by name with an exact-name tie break.
pub fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_parent_link()
        .cmp(&a.is_parent_link())
        .then_with(|| b.is_directory.cmp(&a.is_directory))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Listing options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotOptions {
    /// Prepend a `..` entry when the directory has a parent.
    pub include_parent: bool,
}

/// An immutable, sorted listing of one directory at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorySnapshot {
    path: PathBuf,
    entries: Vec<DirectoryEntry>,
}

impl DirectorySnapshot {
    /// Build a snapshot from already-collected entries, enforcing the ordering.
    pub fn from_entries(path: &Path, mut entries: Vec<DirectoryEntry>) -> Self {
        entries.sort_by(compare_entries);
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// The directory this snapshot lists.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entry names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// List `dir` once and return its sorted snapshot.
///
/// Children that cannot be stat'ed (broken symlinks, permission denials,
/// entries deleted mid-listing) are left out. Failure to list `dir` itself
/// yields [`AppError::DirectoryUnreadable`].
pub fn build_snapshot(dir: &Path, options: SnapshotOptions) -> Result<DirectorySnapshot> {
    let read_dir = fs::read_dir(dir).map_err(|source| AppError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                log::debug!("skipping non UTF-8 name {:?} in {}", raw, dir.display());
                continue;
            }
        };
        // Follow symlinks; a dangling link has no metadata and is skipped.
        match fs::metadata(entry.path()) {
            Ok(metadata) => entries.push(DirectoryEntry::from_metadata(name, &metadata)),
            Err(e) => log::debug!("skipping {}: {}", entry.path().display(), e),
        }
    }

    if options.include_parent {
        if let Some(parent) = dir.parent() {
            let modified = fs::metadata(parent).and_then(|m| m.modified()).ok();
            entries.push(DirectoryEntry {
                name: PARENT_ENTRY.to_string(),
                is_directory: true,
                size_bytes: 0,
                modified_at: to_seconds(modified),
            });
        }
    }

    Ok(DirectorySnapshot::from_entries(dir, entries))
}
