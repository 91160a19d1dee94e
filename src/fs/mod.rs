pub mod clipboard;
pub mod icons;
pub mod operations;
pub mod paths;
pub mod snapshot;
pub mod watcher;
