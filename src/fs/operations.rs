use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{AppError, MutationKind, Result};

/// Check that `name` is a single, plain path component.
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains('\0');
    if invalid {
        return Err(AppError::InvalidPath(format!("invalid name: {:?}", name)));
    }
    Ok(trimmed)
}

/// Create a new directory named `name` inside `dir`.
pub fn create_directory(dir: &Path, name: &str) -> Result<PathBuf> {
    let name = validate_name(name)?;
    let path = dir.join(name);
    fs::create_dir(&path).map_err(|e| AppError::mutation(MutationKind::CreateDirectory, &path, e))?;
    Ok(path)
}

/// Rename `path` in place to `new_name`. Never overwrites an existing item.
pub fn rename_item(path: &Path, new_name: &str) -> Result<PathBuf> {
    let new_name = validate_name(new_name)?;
    let parent = path.parent().ok_or_else(|| {
        AppError::InvalidPath(format!("{} has no parent", path.display()))
    })?;
    let target = parent.join(new_name);
    if target == path {
        return Ok(target);
    }
    if occupied(&target) {
        return Err(AppError::mutation(
            MutationKind::Rename,
            path,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ),
        ));
    }
    fs::rename(path, &target).map_err(|e| AppError::mutation(MutationKind::Rename, path, e))?;
    Ok(target)
}

/// Resolve a name collision by appending `_copy`, `_copy2`, etc.
///
/// Returns a path that does not exist yet in the destination directory.
pub fn resolve_collision(dest: &Path) -> PathBuf {
    if !occupied(dest) {
        return dest.to_path_buf();
    }

    let parent = dest.parent().unwrap_or(Path::new("."));
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = dest.extension().map(|e| e.to_string_lossy().to_string());

    for i in 1..=1000 {
        let suffix = if i == 1 {
            "_copy".to_string()
        } else {
            format!("_copy{}", i)
        };
        let new_name = match &ext {
            Some(e) => format!("{}{}.{}", stem, suffix, e),
            None => format!("{}{}", stem, suffix),
        };
        let candidate = parent.join(&new_name);
        if !occupied(&candidate) {
            return candidate;
        }
    }

    dest.to_path_buf()
}

/// Whether a name is taken, counting dangling symlinks.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn file_name_of(src: &Path) -> io::Result<&std::ffi::OsStr> {
    src.file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no filename"))
}

/// Refuse to place a directory inside itself.
fn check_not_nested(src: &Path, dest_dir: &Path) -> io::Result<()> {
    let is_dir = fs::symlink_metadata(src).is_ok_and(|m| m.is_dir());
    if is_dir && dest_dir.starts_with(src) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot place {} inside itself", src.display()),
        ));
    }
    Ok(())
}

/// Recursively copy a file or directory from `src` into `dest_dir`.
///
/// Symlinks are recreated, never followed. A failed copy leaves nothing
/// behind in `dest_dir`. Returns the final path of the copied item (with
/// collision resolution).
pub fn copy_recursive(src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    let name = file_name_of(src)?;
    check_not_nested(src, dest_dir)?;
    let dest = resolve_collision(&dest_dir.join(name));
    copy_fresh(src, &dest)?;
    Ok(dest)
}

/// Copy `src` to the not yet existing `dest`, removing any partial result
/// on failure.
fn copy_fresh(src: &Path, dest: &Path) -> io::Result<()> {
    let result = copy_entry(src, dest);
    if result.is_err() {
        remove_partial(dest);
    }
    result
}

fn copy_entry(src: &Path, dest: &Path) -> io::Result<()> {
    let file_type = fs::symlink_metadata(src)?.file_type();
    if file_type.is_symlink() {
        copy_link(src, dest)
    } else if file_type.is_dir() {
        copy_dir_recursive(src, dest)
    } else {
        fs::copy(src, dest).map(|_| ())
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        copy_entry(&entry.path(), &dest.join(entry.file_name()))?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(src: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dest)
}

#[cfg(not(unix))]
fn copy_link(src: &Path, _dest: &Path) -> io::Result<()> {
    log::warn!("skipping symlink {}", src.display());
    Ok(())
}

fn remove_partial(dest: &Path) {
    let Ok(metadata) = fs::symlink_metadata(dest) else {
        return;
    };
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(dest)
    } else {
        fs::remove_file(dest)
    };
    if let Err(e) = removed {
        log::warn!("could not clean up {}: {}", dest.display(), e);
    }
}

/// Copy `src` to `dest`, then remove `src`.
fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    copy_fresh(src, dest)?;
    if fs::symlink_metadata(src)?.is_dir() {
        fs::remove_dir_all(src)
    } else {
        fs::remove_file(src)
    }
}

/// Move a file or directory from `src` into `dest_dir`.
///
/// Uses `fs::rename` first (same device) and falls back to copy+delete.
/// Moving an item into the directory it already lives in is a no-op.
pub fn move_item(src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    let name = file_name_of(src)?;
    if src.parent() == Some(dest_dir) {
        return Ok(src.to_path_buf());
    }
    if fs::symlink_metadata(src).is_err() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", src.display()),
        ));
    }
    check_not_nested(src, dest_dir)?;
    let dest = resolve_collision(&dest_dir.join(name));

    if fs::rename(src, &dest).is_err() {
        copy_then_remove(src, &dest)?;
    }
    Ok(dest)
}

/// A recoverable deletion target.
pub trait Trash: Send + Sync {
    fn discard(&self, path: &Path) -> io::Result<()>;
}

/// The platform recycle bin.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn discard(&self, path: &Path) -> io::Result<()> {
        trash::delete(path).map_err(|e| io::Error::other(e.to_string()))
    }
}

/// A trash bin kept in a plain directory. Items are stored as
/// `<millis>.<name>` so repeated deletions of one name never clash.
#[derive(Debug, Clone)]
pub struct DirTrash {
    root: PathBuf,
}

impl DirTrash {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Trash for DirTrash {
    fn discard(&self, path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
        fs::create_dir_all(&self.root)?;
        let name = file_name_of(path)?;
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let target = resolve_collision(
            &self
                .root
                .join(format!("{}.{}", stamp, name.to_string_lossy())),
        );
        if fs::rename(path, &target).is_err() {
            copy_then_remove(path, &target)?;
        }
        Ok(())
    }
}

/// Result of a fail-fast batch: the items completed before the first
/// failure, and that failure if any.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Resulting paths (destinations for copy/move, removed paths for delete).
    pub done: Vec<PathBuf>,
    pub error: Option<AppError>,
}

fn run_batch<F>(paths: &[PathBuf], kind: MutationKind, mut op: F) -> BatchOutcome
where
    F: FnMut(&Path) -> io::Result<PathBuf>,
{
    let mut outcome = BatchOutcome::default();
    for path in paths {
        match op(path) {
            Ok(result) => outcome.done.push(result),
            Err(e) => {
                log::warn!("{} stopped at {}: {}", kind, path.display(), e);
                outcome.error = Some(AppError::mutation(kind, path, e));
                break;
            }
        }
    }
    outcome
}

/// Copy every path into `dest_dir`, stopping at the first failure.
pub fn copy_all(paths: &[PathBuf], dest_dir: &Path) -> BatchOutcome {
    run_batch(paths, MutationKind::Copy, |p| copy_recursive(p, dest_dir))
}

/// Move every path into `dest_dir`, stopping at the first failure.
pub fn move_all(paths: &[PathBuf], dest_dir: &Path) -> BatchOutcome {
    run_batch(paths, MutationKind::Move, |p| move_item(p, dest_dir))
}

/// Send every path to `trash`, stopping at the first failure.
pub fn delete_all(paths: &[PathBuf], trash: &dyn Trash) -> BatchOutcome {
    run_batch(paths, MutationKind::Delete, |p| {
        trash.discard(p).map(|()| p.to_path_buf())
    })
}
