use std::io::{self, BufRead};

use tokio::sync::mpsc;

use crate::app::JobOutput;
use crate::error::{AppError, Result};
use crate::fs::watcher::{ChangeBatch, ChangeReceiver};

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A command line typed by the user.
    Input(String),
    /// Standard input reached end of file.
    InputClosed,
    /// A blocking job finished on a worker thread.
    JobDone(JobOutput),
    /// Filesystem changes, debounced.
    Changes(ChangeBatch),
}

/// Single channel carrying input lines, job results and change batches to
/// the UI task.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, tx }
    }

    /// Start forwarding lines typed on stdin.
    ///
    /// Reads on a plain thread: a blocking read parked on the runtime's
    /// pool would hold up runtime shutdown until the next line arrives.
    pub fn read_stdin(&self) {
        let event_tx = self.tx.clone();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if event_tx.send(Event::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        log::error!("failed to read input: {}", e);
                        break;
                    }
                }
            }
            let _ = event_tx.send(Event::InputClosed);
        });
    }

    /// Get a sender clone for worker tasks to report results.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Forward debounced change batches from the watcher queue.
    pub fn forward_changes(&self, mut changes: ChangeReceiver) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(batch) = changes.recv().await {
                if tx.send(Event::Changes(batch)).is_err() {
                    break;
                }
            }
        });
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx.recv().await.ok_or_else(|| {
            AppError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "event channel closed",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::watcher::{change_channel, ChangeKind, ChangeNotice};
    use std::time::Duration;

    #[tokio::test]
    async fn change_batches_are_forwarded() {
        let mut events = EventHandler::new();
        let (sender, receiver) = change_channel(8, Duration::from_millis(10));
        events.forward_changes(receiver);
        sender.send(ChangeNotice::new(ChangeKind::Created, "/tmp/x"));

        match events.next().await.unwrap() {
            Event::Changes(batch) => assert_eq!(batch.notices.len(), 1),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
