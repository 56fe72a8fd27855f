//! File system event types.

#![allow(clippy::missing_const_for_fn)]

use std::fmt;
use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind};
use tokio::time::Instant;

/// Kind of change reported for a path.
///
/// Every kind is treated the same way by the rebuild engine; the kind is kept
/// for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File or directory was created.
    Create,
    /// File contents were written.
    Write,
    /// File or directory was removed.
    Remove,
    /// File or directory was renamed.
    Rename,
    /// Any other notification (access, metadata, unknown).
    Other,
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Create,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::Other,
            EventKind::Modify(_) => Self::Write,
            EventKind::Remove(_) => Self::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Self::Other,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Write => "WRITE",
            Self::Remove => "REMOVE",
            Self::Rename => "RENAME",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// A single filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Affected path.
    pub path: PathBuf,
    /// Operation kind.
    pub kind: ChangeKind,
    /// When the notification arrived.
    pub at: Instant,
}

impl ChangeEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            at: Instant::now(),
        }
    }

    /// Get the affected path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Message delivered by an event source to a watch loop.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A filesystem change.
    Change(ChangeEvent),
    /// Asynchronous error from the notification backend.
    Error(String),
}
