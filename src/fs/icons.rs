//! Display icons for listing entries.
//!
//! Lookups go through an [`IconProvider`] and are cached by lowercase
//! extension. A provider that has nothing for an extension yields the
//! generic file icon; lookup never fails.

use std::collections::HashMap;
use std::path::Path;

/// An icon as the front end draws it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconHandle(pub &'static str);

impl IconHandle {
    pub const FILE: IconHandle = IconHandle(" ");
    pub const FOLDER: IconHandle = IconHandle(" ");
    pub const PARENT: IconHandle = IconHandle(" ");
}

/// Source of icons, queried once per extension.
pub trait IconProvider {
    fn icon_for_extension(&self, ext: &str) -> Option<IconHandle>;
}

/// Nerd Font glyphs for common extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlyphIcons;

impl IconProvider for GlyphIcons {
    fn icon_for_extension(&self, ext: &str) -> Option<IconHandle> {
        let glyph = match ext {
            "rs" => " ",
            "py" => " ",
            "js" | "jsx" => " ",
            "ts" | "tsx" => " ",
            "html" | "htm" => " ",
            "css" | "scss" => " ",
            "json" => " ",
            "toml" | "yaml" | "yml" | "ini" | "cfg" => " ",
            "md" | "txt" | "rst" => " ",
            "sh" | "bash" | "zsh" | "bat" | "ps1" => " ",
            "c" | "h" | "cpp" | "hpp" => " ",
            "exe" | "dll" | "so" => " ",
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "ico" | "webp" => " ",
            "mp3" | "wav" | "flac" | "ogg" => " ",
            "mp4" | "mkv" | "avi" | "mov" => " ",
            "zip" | "tar" | "gz" | "xz" | "rar" | "7z" => " ",
            "pdf" => " ",
            "lnk" => " ",
            _ => return None,
        };
        Some(IconHandle(glyph))
    }
}

/// Extension-keyed cache in front of a provider.
pub struct IconCache<P: IconProvider = GlyphIcons> {
    provider: P,
    by_ext: HashMap<String, IconHandle>,
}

impl Default for IconCache<GlyphIcons> {
    fn default() -> Self {
        Self::new(GlyphIcons)
    }
}

impl<P: IconProvider> IconCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            by_ext: HashMap::new(),
        }
    }

    /// `GetDisplayIcon(path)`.
    pub fn display_icon(&mut self, path: &Path, is_directory: bool) -> IconHandle {
        if path.file_name().is_some_and(|n| n == "..") {
            return IconHandle::PARENT;
        }
        if is_directory {
            return IconHandle::FOLDER;
        }
        let Some(ext) = path.extension() else {
            return IconHandle::FILE;
        };
        let ext = ext.to_string_lossy().to_lowercase();
        if let Some(icon) = self.by_ext.get(&ext) {
            return *icon;
        }
        let icon = self
            .provider
            .icon_for_extension(&ext)
            .unwrap_or(IconHandle::FILE);
        self.by_ext.insert(ext, icon);
        icon
    }

    pub fn cached(&self) -> usize {
        self.by_ext.len()
    }
}
