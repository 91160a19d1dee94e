//! Directory live-view synchronization core of a dual-pane, tabbed file
//! manager, plus a line-oriented shell front end.

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod handler;
pub mod nav;
pub mod reconcile;
pub mod ui;
pub mod view;
pub mod watch;

pub use error::{AppError, ErrorKind, Result};
