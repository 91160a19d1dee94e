use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::sync::mpsc::UnboundedSender;

use dirsync_fm::app::{App, Job, Options};
use dirsync_fm::config::{AppConfig, GeneralConfig, WatcherConfig};
use dirsync_fm::error::{self, AppError};
use dirsync_fm::event::{Event, EventHandler};
use dirsync_fm::fs::operations::{DirTrash, SystemTrash, Trash};
use dirsync_fm::fs::paths;
use dirsync_fm::fs::watcher::{change_channel, NotifySource};
use dirsync_fm::{handler, ui};

/// A dual-pane file manager shell with live directory updates.
#[derive(Parser, Debug)]
#[command(name = "fm", version, about)]
struct Cli {
    /// Left pane directory (defaults to the home directory)
    left: Option<String>,

    /// Right pane directory (defaults to the left one)
    right: Option<String>,

    /// Path to a config file (overrides the default locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Show a single pane
    #[arg(long)]
    single_pane: bool,

    /// Print the left pane as JSON and exit
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Config values implied by flags.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                single_pane: self.single_pane.then_some(true),
                ..Default::default()
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Resolve a start directory, falling back when it is not a directory.
fn start_dir(input: Option<&str>, fallback: &Path, cwd: &Path) -> PathBuf {
    let Some(input) = input else {
        return fallback.to_path_buf();
    };
    let path = paths::resolve(input, cwd);
    if path.is_dir() {
        path
    } else {
        log::warn!(
            "{} is not a directory, starting in {}",
            path.display(),
            fallback.display()
        );
        fallback.to_path_buf()
    }
}

/// Run jobs on the blocking pool; results come back as events.
fn dispatch(jobs: Vec<Job>, tx: &UnboundedSender<Event>) {
    for job in jobs {
        let tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(Event::JobDone(job.run()));
        });
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(AppError::Config(format!("{} not found", path.display())));
        }
    }
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level()),
    )
    .init();

    let cwd = std::env::current_dir()?;
    let home = dirs::home_dir().unwrap_or_else(|| cwd.clone());
    let default_start = start_dir(config.start_path(), &home, &cwd);
    let left = start_dir(cli.left.as_deref(), &default_start, &cwd);
    let mut panes = vec![left.clone()];
    if !config.single_pane() {
        panes.push(start_dir(cli.right.as_deref(), &left, &cwd));
    }

    let trash: Arc<dyn Trash> = match config.trash_dir() {
        Some(dir) => Arc::new(DirTrash::new(dir)),
        None => Arc::new(SystemTrash),
    };
    let mut app = App::new(&panes, Options::from(&config), trash);

    if cli.json {
        let jobs = app.start();
        if let Some(e) = app.run_blocking(jobs).into_iter().next() {
            return Err(e);
        }
        println!("{}", ui::render_json(app.focused_view())?);
        return Ok(());
    }

    let mut events = EventHandler::new();
    let event_tx = events.sender();

    let change_sender = if config.watcher_enabled() {
        let (sender, receiver) = change_channel(config.queue_capacity(), config.debounce());
        app = app.with_watch(Box::new(NotifySource::new(sender.clone())));
        events.forward_changes(receiver);
        Some(sender)
    } else {
        None
    };
    events.read_stdin();

    let use_icons = config.use_icons();
    dispatch(app.start(), &event_tx);
    println!("fm: type 'help' for commands");

    let mut last_status: Option<Instant> = None;
    loop {
        match events.next().await? {
            Event::Input(line) => {
                let reply = handler::handle_line(&mut app, &line, use_icons);
                if let Some(output) = reply.output {
                    println!("{}", output);
                }
                dispatch(reply.jobs, &event_tx);
            }
            Event::InputClosed => app.quit(),
            Event::JobDone(output) => {
                let step = app.complete(output);
                dispatch(step.jobs, &event_tx);
            }
            Event::Changes(batch) => dispatch(app.handle_changes(batch), &event_tx),
        }

        // Sync watcher pause/resume state
        if let Some(sender) = &change_sender {
            if app.watcher_active && !sender.is_active() {
                sender.resume();
            } else if !app.watcher_active && sender.is_active() {
                sender.pause();
            }
        }

        if let Some((msg, at)) = &app.status_message {
            if last_status != Some(*at) {
                println!("{}", msg);
                last_status = Some(*at);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
