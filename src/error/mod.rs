//! Error types and Result aliases for devloop.
//!
//! This module defines the error hierarchy used throughout the crate.
//! Only configuration and server startup errors are fatal; watcher and
//! build errors are logged where they occur and the daemon keeps running.

use thiserror::Error;

/// Result type alias using devloop's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for devloop operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Server error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to subscribe to a watch root.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// An ignore pattern could not be parsed.
    #[error("invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Build command errors, carried inside a build result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The build process could not be started.
    #[error("failed to launch '{program}': {reason}")]
    Launch { program: String, reason: String },

    /// The build process exited with a non-zero status.
    #[error("build exited with status {code}")]
    Exit { code: i32 },

    /// The build process was killed by a signal.
    #[error("build terminated by signal")]
    Signaled,
}

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Error while serving requests.
    #[error("serve error: {0}")]
    Serve(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl WatcherError {
    /// Create a watch failure for `path`.
    pub fn watch_failed(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::WatchFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
