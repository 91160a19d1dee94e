use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// The filesystem mutation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    CreateDirectory,
    Delete,
    Rename,
    Copy,
    Move,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MutationKind::CreateDirectory => "create directory",
            MutationKind::Delete => "delete",
            MutationKind::Rename => "rename",
            MutationKind::Copy => "copy",
            MutationKind::Move => "move",
        };
        f.write_str(label)
    }
}

/// Discriminant of [`AppError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PathNotFound,
    PathNotReadable,
    DirectoryUnreadable,
    MutationFailed,
    WatchSubscriptionFailed,
    Io,
    InvalidPath,
    Config,
    Command,
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Navigation target does not exist.
    #[error("Path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// Navigation target exists but cannot be listed.
    #[error("Path not readable: {}: {source}", path.display())]
    PathNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory of an open view could not be listed during a refresh.
    #[error("Cannot read directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A filesystem mutation failed for one item of a batch.
    #[error("Failed to {operation} {}: {source}", path.display())]
    MutationFailed {
        operation: MutationKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Live updates could not be enabled for a directory.
    #[error("Watcher unavailable for {}: {source}", path.display())]
    WatchSubscriptionFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// I/O errors outside the taxonomy above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid path or name provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration could not be used.
    #[error("Config error: {0}")]
    Config(String),

    /// A shell command line could not be understood.
    #[error("{0}")]
    Command(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::PathNotFound { .. } => ErrorKind::PathNotFound,
            AppError::PathNotReadable { .. } => ErrorKind::PathNotReadable,
            AppError::DirectoryUnreadable { .. } => ErrorKind::DirectoryUnreadable,
            AppError::MutationFailed { .. } => ErrorKind::MutationFailed,
            AppError::WatchSubscriptionFailed { .. } => ErrorKind::WatchSubscriptionFailed,
            AppError::Io(_) => ErrorKind::Io,
            AppError::InvalidPath(_) => ErrorKind::InvalidPath,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Command(_) => ErrorKind::Command,
        }
    }

    /// The path the error is about, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            AppError::PathNotFound { path }
            | AppError::PathNotReadable { path, .. }
            | AppError::DirectoryUnreadable { path, .. }
            | AppError::MutationFailed { path, .. }
            | AppError::WatchSubscriptionFailed { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn mutation(operation: MutationKind, path: &Path, source: std::io::Error) -> Self {
        AppError::MutationFailed {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}
