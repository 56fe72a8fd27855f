//! File system watching and debounced rebuilds.
//!
//! This module provides:
//! - Directory subscriptions using notify-rs
//! - Backup, generated-output and pattern based event filtering
//! - Debounce bookkeeping and the per-root watch loop

mod debounce;
mod driver;
mod events;
mod filter;
#[allow(clippy::module_inception)]
mod watcher;

pub use debounce::{DebouncePolicy, LoopPhase, RebuildState, DEFAULT_DEBOUNCE, DEFAULT_TICK};
pub use driver::{spawn_watch, WatchLoop, WatchLoopConfig, WatcherStats, WatcherStatsSnapshot};
pub use events::{ChangeEvent, ChangeKind, SourceEvent};
pub use filter::{EventFilter, FilterConfig, DEFAULT_BACKUP_SUFFIX, DEFAULT_GENERATED_DIR};
pub use watcher::FsEventSource;
