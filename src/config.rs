//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (later wins, values merge field by field):
//! 1. Built-in defaults
//! 2. Global `<config_dir>/dirsync-fm/config.toml`
//! 3. Project-local `.dirsync-fm.toml` in the current working directory
//! 4. `$DIRSYNC_FM_CONFIG` environment variable (path to config file)
//! 5. `--config <file>`
//! 6. CLI flags (`--no-watcher`, `--single-pane`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fs::watcher::{DEFAULT_DEBOUNCE_MS, DEFAULT_QUEUE_CAPACITY};
use crate::view::{DEFAULT_HISTORY_CAPACITY, DEFAULT_VIEWPORT_ROWS};

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory for both panes (overridden by CLI positional args).
    pub start_path: Option<String>,
    /// Prepend a `..` entry to listings that have a parent.
    pub show_parent_entry: Option<bool>,
    /// Ask before moving items to the trash.
    pub confirm_delete: Option<bool>,
    /// Rows considered visible when preserving the scroll anchor.
    pub viewport_rows: Option<usize>,
    /// Use nerd font icons (false = ASCII fallback).
    pub use_icons: Option<bool>,
    /// Keep deleted items in this directory instead of the system trash.
    pub trash_dir: Option<String>,
    /// Show only one pane.
    pub single_pane: Option<bool>,
}

/// History settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// Navigation history entries kept per tab.
    pub capacity: Option<usize>,
    /// Closed tabs kept for reopening, per pane.
    pub closed_tabs: Option<usize>,
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable filesystem watcher for auto-refresh.
    pub enabled: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Notices buffered before the queue reports an overflow.
    pub queue_capacity: Option<usize>,
}

/// Logging settings. `RUST_LOG` takes precedence.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub history: HistoryConfig,
    pub watcher: WatcherConfig,
    pub log: LogConfig,
}

/// Default number of closed tabs a pane remembers.
pub const DEFAULT_CLOSED_TABS: usize = 10;
/// Default log level when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

// ── Config file locator ──────────────────────────────────────────────────────

/// Candidate config files, lowest priority first.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("dirsync-fm").join("config.toml"));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".dirsync-fm.toml"));
    }

    if let Ok(env_path) = std::env::var("DIRSYNC_FM_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr,
/// since the logger is configured from the result).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                start_path: other
                    .general
                    .start_path
                    .clone()
                    .or(self.general.start_path),
                show_parent_entry: other
                    .general
                    .show_parent_entry
                    .or(self.general.show_parent_entry),
                confirm_delete: other.general.confirm_delete.or(self.general.confirm_delete),
                viewport_rows: other.general.viewport_rows.or(self.general.viewport_rows),
                use_icons: other.general.use_icons.or(self.general.use_icons),
                trash_dir: other.general.trash_dir.clone().or(self.general.trash_dir),
                single_pane: other.general.single_pane.or(self.general.single_pane),
            },
            history: HistoryConfig {
                capacity: other.history.capacity.or(self.history.capacity),
                closed_tabs: other.history.closed_tabs.or(self.history.closed_tabs),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                debounce_ms: other.watcher.debounce_ms.or(self.watcher.debounce_ms),
                queue_capacity: other.watcher.queue_capacity.or(self.watcher.queue_capacity),
            },
            log: LogConfig {
                level: other.log.level.clone().or(self.log.level),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        for path in candidate_paths() {
            if let Some(file_cfg) = load_file(&path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn start_path(&self) -> Option<&str> {
        self.general.start_path.as_deref()
    }

    pub fn show_parent_entry(&self) -> bool {
        self.general.show_parent_entry.unwrap_or(true)
    }

    pub fn confirm_delete(&self) -> bool {
        self.general.confirm_delete.unwrap_or(true)
    }

    pub fn viewport_rows(&self) -> usize {
        self.general
            .viewport_rows
            .unwrap_or(DEFAULT_VIEWPORT_ROWS)
            .max(1)
    }

    pub fn use_icons(&self) -> bool {
        self.general.use_icons.unwrap_or(false)
    }

    pub fn trash_dir(&self) -> Option<&Path> {
        self.general.trash_dir.as_deref().map(Path::new)
    }

    pub fn single_pane(&self) -> bool {
        self.general.single_pane.unwrap_or(false)
    }

    pub fn history_capacity(&self) -> usize {
        self.history
            .capacity
            .unwrap_or(DEFAULT_HISTORY_CAPACITY)
            .max(1)
    }

    pub fn closed_tabs(&self) -> usize {
        self.history.closed_tabs.unwrap_or(DEFAULT_CLOSED_TABS)
    }

    /// Whether the watcher is enabled.
    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    /// Watcher debounce interval.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watcher.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    pub fn queue_capacity(&self) -> usize {
        self.watcher
            .queue_capacity
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
            .max(1)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.start_path(), None);
        assert!(cfg.show_parent_entry());
        assert!(cfg.confirm_delete());
        assert_eq!(cfg.viewport_rows(), 30);
        assert!(!cfg.use_icons());
        assert_eq!(cfg.trash_dir(), None);
        assert!(!cfg.single_pane());
        assert_eq!(cfg.history_capacity(), 10);
        assert_eq!(cfg.closed_tabs(), 10);
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.debounce(), Duration::from_millis(300));
        assert_eq!(cfg.queue_capacity(), 256);
        assert_eq!(cfg.log_level(), "warn");
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
start_path = "~/work"
show_parent_entry = false
confirm_delete = false
viewport_rows = 12
use_icons = true
trash_dir = "/tmp/bin"
single_pane = true

[history]
capacity = 20
closed_tabs = 3

[watcher]
enabled = false
debounce_ms = 500
queue_capacity = 64

[log]
level = "debug"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.start_path(), Some("~/work"));
        assert!(!cfg.show_parent_entry());
        assert!(!cfg.confirm_delete());
        assert_eq!(cfg.viewport_rows(), 12);
        assert!(cfg.use_icons());
        assert_eq!(cfg.trash_dir(), Some(Path::new("/tmp/bin")));
        assert!(cfg.single_pane());
        assert_eq!(cfg.history_capacity(), 20);
        assert_eq!(cfg.closed_tabs(), 3);
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.debounce(), Duration::from_millis(500));
        assert_eq!(cfg.queue_capacity(), 64);
        assert_eq!(cfg.log_level(), "debug");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[history]
capacity = 5
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.history_capacity(), 5);
        assert_eq!(cfg.closed_tabs(), 10);
        assert!(cfg.confirm_delete());
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let toml = r#"
[general]
viewport_rows = 0
[history]
capacity = 0
[watcher]
queue_capacity = 0
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.viewport_rows(), 1);
        assert_eq!(cfg.history_capacity(), 1);
        assert_eq!(cfg.queue_capacity(), 1);
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                show_parent_entry: Some(false),
                confirm_delete: Some(true),
                ..Default::default()
            },
            history: HistoryConfig {
                capacity: Some(4),
                closed_tabs: Some(2),
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                show_parent_entry: Some(true),
                ..Default::default()
            },
            history: HistoryConfig {
                capacity: Some(8),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.show_parent_entry()); // overridden
        assert!(merged.confirm_delete()); // from base
        assert_eq!(merged.history_capacity(), 8); // overridden
        assert_eq!(merged.closed_tabs(), 2); // from base
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                debounce_ms: Some(500),
                queue_capacity: None,
            },
            log: LogConfig {
                level: Some("info".into()),
            },
            ..Default::default()
        };

        let merged = base.merge(&AppConfig::default());
        assert!(!merged.watcher_enabled());
        assert_eq!(merged.debounce(), Duration::from_millis(500));
        assert_eq!(merged.log_level(), "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[general]
show_parent_entry = false

[watcher]
debounce_ms = 50
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert!(!cfg.show_parent_entry());
        assert_eq!(cfg.debounce(), Duration::from_millis(50));
        assert_eq!(cfg.queue_capacity(), 256);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
viewport_rows = 7

[watcher]
enabled = true
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.viewport_rows(), 7);
    }
}
