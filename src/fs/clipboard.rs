use std::path::{Path, PathBuf};

/// The type of clipboard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOp {
    Copy,
    Cut,
}

/// Process-wide clipboard of absolute paths.
///
/// Overwritten by every copy/cut; paste only reads it, so a copied set can
/// be pasted any number of times and into any pane.
#[derive(Debug, Clone, Default)]
pub struct ClipboardState {
    paths: Vec<PathBuf>,
    operation: Option<ClipboardOp>,
}

impl ClipboardState {
    /// Create a new empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clipboard contents.
    pub fn set(&mut self, paths: Vec<PathBuf>, op: ClipboardOp) {
        self.paths = paths;
        self.operation = Some(op);
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.operation = None;
    }

    pub fn operation(&self) -> Option<ClipboardOp> {
        self.operation
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Whether the clipboard has anything to paste.
    pub fn is_empty(&self) -> bool {
        self.operation.is_none() || self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether `path` is currently held for a cut.
    pub fn is_cut(&self, path: &Path) -> bool {
        self.operation == Some(ClipboardOp::Cut) && self.paths.iter().any(|p| p == path)
    }

    /// Short status-bar description, e.g. `"2 copied"`.
    pub fn describe(&self) -> Option<String> {
        let verb = match self.operation? {
            ClipboardOp::Copy => "copied",
            ClipboardOp::Cut => "cut",
        };
        Some(format!("{} {}", self.paths.len(), verb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clipboard_is_empty() {
        let cb = ClipboardState::new();
        assert!(cb.is_empty());
        assert_eq!(cb.len(), 0);
        assert_eq!(cb.operation(), None);
        assert_eq!(cb.describe(), None);
    }

    #[test]
    fn set_copy_operation() {
        let mut cb = ClipboardState::new();
        cb.set(
            vec![PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/b.txt")],
            ClipboardOp::Copy,
        );
        assert!(!cb.is_empty());
        assert_eq!(cb.operation(), Some(ClipboardOp::Copy));
        assert_eq!(cb.paths()[1], PathBuf::from("/tmp/b.txt"));
        assert_eq!(cb.describe().as_deref(), Some("2 copied"));
    }

    #[test]
    fn set_overwrites_previous() {
        let mut cb = ClipboardState::new();
        cb.set(vec![PathBuf::from("/tmp/old.txt")], ClipboardOp::Copy);
        cb.set(vec![PathBuf::from("/tmp/new.txt")], ClipboardOp::Cut);
        assert_eq!(cb.len(), 1);
        assert!(cb.is_cut(Path::new("/tmp/new.txt")));
        assert!(!cb.is_cut(Path::new("/tmp/old.txt")));
    }

    #[test]
    fn clear_resets_clipboard() {
        let mut cb = ClipboardState::new();
        cb.set(vec![PathBuf::from("/tmp/a.txt")], ClipboardOp::Copy);
        cb.clear();
        assert!(cb.is_empty());
        assert_eq!(cb.operation(), None);
    }

    #[test]
    fn empty_path_list_has_nothing_to_paste() {
        let mut cb = ClipboardState::new();
        cb.set(vec![], ClipboardOp::Copy);
        assert!(cb.is_empty());
    }
}
