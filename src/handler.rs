//! Command-line shell: parses one input line and applies it to the app.

use crate::app::{Activation, App, Job};
use crate::error::{AppError, Result};
use crate::ui;
use crate::watch::PaneId;

pub const HELP: &str = "\
ls                      show panes
cd <path>               go to a directory (~, $VAR and relative paths allowed)
up | back | forward     navigate
refresh | refresh-all   re-list the focused tab / every tab
open <name>             enter a directory or print a file's path
sel <name>... | sel *   select entries
find <text>             select entries whose name contains text
unsel                   clear the selection
scroll <row>            scroll the focused tab
mkdir <name>            create a directory
rename <name> <new>     rename an entry
rm                      move the selection to the trash
copy | cut | paste      clipboard
tab [path]              open a tab
close | reopen          close / reopen a tab
switch <n>              activate tab n
pane [1|2]              focus a pane (toggles without argument)
watch                   pause or resume live updates
json                    print the focused tab as JSON
help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Cd(String),
    Up,
    Back,
    Forward,
    Refresh,
    RefreshAll,
    Open(String),
    Select(Vec<String>),
    SelectAll,
    Find(String),
    Unselect,
    Scroll(usize),
    Mkdir(String),
    Rename(String, String),
    Remove,
    Copy,
    Cut,
    Paste,
    Tab(Option<String>),
    Close,
    Reopen,
    Switch(usize),
    Pane(Option<usize>),
    Watch,
    Json,
    Help,
    Quit,
}

/// What a handled line produced.
#[derive(Default)]
pub struct Reply {
    pub jobs: Vec<Job>,
    /// Text to print.
    pub output: Option<String>,
}

impl Reply {
    fn jobs(jobs: Vec<Job>) -> Self {
        Self { jobs, output: None }
    }

    fn text(output: String) -> Self {
        Self {
            jobs: Vec::new(),
            output: Some(output),
        }
    }
}

/// Split a line into words. Double quotes group words; `\"` is a literal quote.
fn split_args(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(AppError::Command("unterminated quote".into()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn usage(cmd: &str, args: &str) -> AppError {
    AppError::Command(format!("usage: {} {}", cmd, args))
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let words = split_args(line)?;
    let Some((cmd, args)) = words.split_first() else {
        return Ok(None);
    };
    let one = |what: &str| -> Result<String> {
        match args {
            [arg] => Ok(arg.clone()),
            _ => Err(usage(cmd, what)),
        }
    };
    let none = |command: Command| -> Result<Command> {
        if args.is_empty() {
            Ok(command)
        } else {
            Err(AppError::Command(format!("{} takes no arguments", cmd)))
        }
    };
    let index = |what: &str| -> Result<usize> {
        one(what)?
            .parse::<usize>()
            .map_err(|_| usage(cmd, what))
    };

    let command = match cmd.as_str() {
        "ls" => none(Command::List)?,
        "cd" => Command::Cd(one("<path>")?),
        "up" => none(Command::Up)?,
        "back" => none(Command::Back)?,
        "forward" => none(Command::Forward)?,
        "refresh" => none(Command::Refresh)?,
        "refresh-all" => none(Command::RefreshAll)?,
        "open" => Command::Open(one("<name>")?),
        "sel" => match args {
            [] => return Err(usage(cmd, "<name>... | *")),
            [star] if star == "*" => Command::SelectAll,
            names => Command::Select(names.to_vec()),
        },
        "find" => Command::Find(one("<text>")?),
        "unsel" => none(Command::Unselect)?,
        "scroll" => Command::Scroll(index("<row>")?),
        "mkdir" => Command::Mkdir(one("<name>")?),
        "rename" => match args {
            [from, to] => Command::Rename(from.clone(), to.clone()),
            _ => return Err(usage(cmd, "<name> <new-name>")),
        },
        "rm" => none(Command::Remove)?,
        "copy" => none(Command::Copy)?,
        "cut" => none(Command::Cut)?,
        "paste" => none(Command::Paste)?,
        "tab" => match args {
            [] => Command::Tab(None),
            [path] => Command::Tab(Some(path.clone())),
            _ => return Err(usage(cmd, "[path]")),
        },
        "close" => none(Command::Close)?,
        "reopen" => none(Command::Reopen)?,
        "switch" => match index("<n>")? {
            0 => return Err(usage(cmd, "<n> (tabs count from 1)")),
            n => Command::Switch(n - 1),
        },
        "pane" => match args {
            [] => Command::Pane(None),
            _ => match index("[1|2]")? {
                0 => return Err(usage(cmd, "[1|2]")),
                n => Command::Pane(Some(n - 1)),
            },
        },
        "watch" => none(Command::Watch)?,
        "json" => none(Command::Json)?,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => {
            return Err(AppError::Command(format!(
                "unknown command '{}' (try 'help')",
                other
            )))
        }
    };
    Ok(Some(command))
}

/// Handle one input line. Errors end up in the status message; they never
/// stop the shell.
pub fn handle_line(app: &mut App, line: &str, use_icons: bool) -> Reply {
    if app.has_pending_delete() {
        let answer = line.trim().to_lowercase();
        let yes = answer == "y" || answer == "yes";
        let jobs = app.confirm_delete(yes);
        if yes || answer == "n" || answer == "no" {
            return Reply::jobs(jobs);
        }
    }

    let result = parse(line).and_then(|command| match command {
        Some(command) => execute(app, command, use_icons),
        None => Ok(Reply::default()),
    });
    match result {
        Ok(reply) => reply,
        Err(e) => {
            log::debug!("command failed: {}", e);
            app.set_status_message(format!("✗ {}", e));
            Reply::default()
        }
    }
}

fn execute(app: &mut App, command: Command, use_icons: bool) -> Result<Reply> {
    let reply = match command {
        Command::List => Reply::text(ui::render(app, use_icons)),
        Command::Cd(path) => Reply::jobs(app.navigate(&path)),
        Command::Up => Reply::jobs(app.up()),
        Command::Back => Reply::jobs(app.back()),
        Command::Forward => Reply::jobs(app.forward()),
        Command::Refresh => Reply::jobs(app.refresh()),
        Command::RefreshAll => Reply::jobs(app.refresh_all()),
        Command::Open(name) => match app.activate(&name)? {
            Activation::Jobs(jobs) => Reply::jobs(jobs),
            Activation::Open(path) => Reply::text(path.display().to_string()),
        },
        Command::Select(names) => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let selected = app.select(&names);
            if selected < names.len() {
                app.set_status_message(format!(
                    "Selected {} of {} name(s)",
                    selected,
                    names.len()
                ));
            }
            Reply::default()
        }
        Command::SelectAll => {
            app.select_all();
            Reply::default()
        }
        Command::Find(text) => {
            let count = app.select_matching(&text);
            app.set_status_message(format!("{} match(es)", count));
            Reply::default()
        }
        Command::Unselect => {
            app.clear_selection();
            Reply::default()
        }
        Command::Scroll(row) => {
            app.scroll_to(row);
            Reply::default()
        }
        Command::Mkdir(name) => Reply::jobs(app.create_directory(&name)?),
        Command::Rename(from, to) => Reply::jobs(app.rename(&from, &to)?),
        Command::Remove => Reply::jobs(app.delete()),
        Command::Copy => {
            app.copy();
            Reply::default()
        }
        Command::Cut => {
            app.cut();
            Reply::default()
        }
        Command::Paste => Reply::jobs(app.paste()?),
        Command::Tab(path) => Reply::jobs(app.new_tab(path.as_deref())),
        Command::Close => Reply::jobs(app.close_tab()),
        Command::Reopen => Reply::jobs(app.reopen_tab()),
        Command::Switch(index) => Reply::jobs(app.switch_tab(index)),
        Command::Pane(Some(index)) => {
            app.focus_pane(PaneId(index));
            Reply::default()
        }
        Command::Pane(None) => {
            app.toggle_focus();
            Reply::default()
        }
        Command::Watch => {
            app.watcher_active = !app.watcher_active;
            let state = if app.watcher_active {
                "resumed"
            } else {
                "paused"
            };
            app.set_status_message(format!("Live updates {}", state));
            // Catch up on whatever changed while paused.
            if app.watcher_active {
                Reply::jobs(app.refresh_all())
            } else {
                Reply::default()
            }
        }
        Command::Json => Reply::text(ui::render_json(app.focused_view())?),
        Command::Help => Reply::text(HELP.to_string()),
        Command::Quit => {
            app.quit();
            Reply::default()
        }
    };
    Ok(reply)
}
