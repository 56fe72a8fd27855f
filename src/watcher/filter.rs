//! Event filtering: decides which changes should trigger a rebuild.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use super::events::ChangeEvent;
use crate::error::WatcherError;
use crate::Result;

/// Suffix of editor backup files.
pub const DEFAULT_BACKUP_SUFFIX: &str = ".bck";

/// Directory the build writes its output into.
pub const DEFAULT_GENERATED_DIR: &str = "public";

/// Filter settings shared by every watch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Paths ending with any of these suffixes are ignored.
    pub backup_suffixes: Vec<String>,
    /// Paths ending with, or passing below the watch root through, a
    /// directory of this name are ignored.
    pub generated_dirs: Vec<String>,
    /// Extra gitignore-style patterns, relative to the watch root.
    pub ignore_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            backup_suffixes: vec![DEFAULT_BACKUP_SUFFIX.to_string()],
            generated_dirs: vec![DEFAULT_GENERATED_DIR.to_string()],
            ignore_patterns: Vec::new(),
        }
    }
}

/// Classifies change events as relevant or noise.
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: Option<PathBuf>,
    backup_suffixes: Vec<String>,
    generated_dirs: Vec<String>,
    ignore: Option<Gitignore>,
}

impl Default for EventFilter {
    fn default() -> Self {
        let config = FilterConfig::default();
        Self {
            root: None,
            backup_suffixes: config.backup_suffixes,
            generated_dirs: config.generated_dirs,
            ignore: None,
        }
    }
}

impl EventFilter {
    /// Create a filter for events under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if an ignore pattern is invalid.
    pub fn for_root(root: impl AsRef<Path>, config: &FilterConfig) -> Result<Self> {
        let ignore = if config.ignore_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(root.as_ref());
            for pattern in &config.ignore_patterns {
                builder
                    .add_line(None, pattern)
                    .map_err(|e| WatcherError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
            }
            let gitignore = builder.build().map_err(|e| WatcherError::InvalidPattern {
                pattern: config.ignore_patterns.join(","),
                reason: e.to_string(),
            })?;
            Some(gitignore)
        };

        Ok(Self {
            root: Some(root.as_ref().to_path_buf()),
            backup_suffixes: config.backup_suffixes.clone(),
            generated_dirs: config.generated_dirs.clone(),
            ignore,
        })
    }

    /// Check whether an event should mark a rebuild as pending.
    ///
    /// The operation kind is never consulted.
    #[must_use]
    pub fn is_relevant(&self, event: &ChangeEvent) -> bool {
        let path = event.path();
        if self.is_noise(path) {
            tracing::trace!(path = %path.display(), kind = %event.kind, "Ignoring change");
            return false;
        }
        true
    }

    /// Check if a path is a backup file, generated output or user-ignored.
    #[must_use]
    pub fn is_noise(&self, path: &Path) -> bool {
        self.is_backup(path) || self.is_generated(path) || self.is_ignored(path)
    }

    fn is_backup(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.backup_suffixes
            .iter()
            .any(|suffix| path_str.ends_with(suffix.as_str()))
    }

    fn is_generated(&self, path: &Path) -> bool {
        let is_marker =
            |name: &OsStr| self.generated_dirs.iter().any(|dir| name == dir.as_str());
        // Ancestors of the root never count.
        match self.root.as_deref().map(|root| path.strip_prefix(root)) {
            Some(Ok(relative)) => relative.components().any(|c| is_marker(c.as_os_str())),
            _ => path.file_name().is_some_and(is_marker),
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Some(ref gi) = self.ignore else {
            return false;
        };
        let is_dir = path.is_dir();
        // Parent matching requires the path to live under the root.
        if path.starts_with(gi.path()) {
            gi.matched_path_or_any_parents(path, is_dir).is_ignore()
        } else {
            gi.matched(path, is_dir).is_ignore()
        }
    }
}
