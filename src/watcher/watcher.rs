//! Filesystem event source using notify-rs.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::events::{ChangeEvent, ChangeKind, SourceEvent};
use crate::error::WatcherError;
use crate::Result;

/// OS subscription for one watch root.
///
/// Dropping the source stops the subscription and closes its channel.
pub struct FsEventSource {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FsEventSource {
    /// Subscribe to changes under `root`.
    ///
    /// Returns the source (keep it alive) and the receiving end of its event
    /// channel. The notify callback only pushes onto an unbounded channel, so
    /// it never blocks the notification thread.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or cannot be watched.
    pub fn new(
        root: impl AsRef<Path>,
        recursive: bool,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SourceEvent>)> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(WatcherError::watch_failed(&root, "directory does not exist").into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    let kind = ChangeKind::from(&event.kind);
                    for path in event.paths {
                        let _ = tx.send(SourceEvent::Change(ChangeEvent::new(path, kind)));
                    }
                }
                Err(e) => {
                    let _ = tx.send(SourceEvent::Error(e.to_string()));
                }
            },
        )
        .map_err(|e| WatcherError::watch_failed(&root, e))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&root, mode)
            .map_err(|e| WatcherError::watch_failed(&root, e))?;

        tracing::info!(path = %root.display(), recursive, "Watching directory");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// The watched root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
