//! Per-root watch loop: filter, debounce, build.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::debounce::{DebouncePolicy, RebuildState, DEFAULT_DEBOUNCE, DEFAULT_TICK};
use super::events::{ChangeEvent, SourceEvent};
use super::filter::{EventFilter, FilterConfig};
use super::watcher::FsEventSource;
use crate::build::{BuildRunner, BuildSupervisor};
use crate::Result;

/// Counters for one watch loop.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub events_seen: AtomicU64,
    pub events_ignored: AtomicU64,
    pub builds_started: AtomicU64,
    pub builds_failed: AtomicU64,
    pub source_errors: AtomicU64,
}

impl WatcherStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            events_seen: self.events_seen.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            builds_started: self.builds_started.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStatsSnapshot {
    pub events_seen: u64,
    pub events_ignored: u64,
    pub builds_started: u64,
    pub builds_failed: u64,
    pub source_errors: u64,
}

/// Timing settings for a watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchLoopConfig {
    /// How often the debounce condition is checked.
    pub tick: Duration,
    /// Debounce threshold.
    pub debounce: Duration,
    /// What the threshold is measured from.
    pub policy: DebouncePolicy,
}

impl Default for WatchLoopConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            debounce: DEFAULT_DEBOUNCE,
            policy: DebouncePolicy::default(),
        }
    }
}

/// Drives one watch root: receives events, filters them, and launches
/// builds through the shared supervisor when the debounce window allows.
pub struct WatchLoop<R: BuildRunner> {
    root: PathBuf,
    filter: EventFilter,
    supervisor: Arc<BuildSupervisor<R>>,
    config: WatchLoopConfig,
    stats: Arc<WatcherStats>,
}

impl<R: BuildRunner> WatchLoop<R> {
    /// Create a loop for `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        filter: EventFilter,
        supervisor: Arc<BuildSupervisor<R>>,
        config: WatchLoopConfig,
    ) -> Self {
        Self {
            root: root.into(),
            filter,
            supervisor,
            config,
            stats: WatcherStats::new(),
        }
    }

    /// Shared handle to this loop's counters.
    #[must_use]
    pub fn stats(&self) -> Arc<WatcherStats> {
        Arc::clone(&self.stats)
    }

    /// The watched root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run until `shutdown` is cancelled, or until `events` closes and no
    /// rebuild is pending.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<SourceEvent>,
        shutdown: CancellationToken,
    ) -> WatcherStatsSnapshot {
        let mut state = RebuildState::new(self.config.debounce, self.config.policy, Instant::now());
        let mut ticker = time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut source_open = true;

        tracing::info!(
            root = %self.root.display(),
            debounce_ms = u64::try_from(self.config.debounce.as_millis()).unwrap_or(u64::MAX),
            policy = ?self.config.policy,
            "Watch loop started"
        );

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::debug!("Shutdown requested");
                    break;
                }

                // Ahead of events so a steady stream cannot starve the check.
                _ = ticker.tick() => {
                    if source_open {
                        source_open = self.drain_queued(&mut state, &mut events);
                    }
                    if state.try_fire(Instant::now()) {
                        self.stats.builds_started.fetch_add(1, Ordering::Relaxed);
                        let result = self.supervisor.build().await;
                        if !result.is_success() {
                            self.stats.builds_failed.fetch_add(1, Ordering::Relaxed);
                        }
                    } else if !source_open && !state.is_pending() {
                        break;
                    }
                }

                message = events.recv(), if source_open => {
                    source_open = self.handle_message(&mut state, message);
                }
            }
        }

        let snapshot = self.stats.snapshot();
        tracing::info!(
            events = snapshot.events_seen,
            ignored = snapshot.events_ignored,
            builds = snapshot.builds_started,
            failed = snapshot.builds_failed,
            "Watch loop stopped"
        );
        snapshot
    }

    /// Apply one message from the source. Returns `false` once it has closed.
    fn handle_message(&self, state: &mut RebuildState, message: Option<SourceEvent>) -> bool {
        match message {
            Some(SourceEvent::Change(event)) => self.handle_change(state, &event),
            Some(SourceEvent::Error(reason)) => {
                self.stats.source_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%reason, "Watcher error");
            }
            None => {
                tracing::debug!("Event source closed");
                return false;
            }
        }
        true
    }

    /// Apply the messages already queued, without waiting for more.
    fn drain_queued(
        &self,
        state: &mut RebuildState,
        events: &mut mpsc::UnboundedReceiver<SourceEvent>,
    ) -> bool {
        for _ in 0..events.len() {
            match events.try_recv() {
                Ok(message) => {
                    if !self.handle_message(state, Some(message)) {
                        return false;
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    return self.handle_message(state, None);
                }
            }
        }
        true
    }

    fn handle_change(&self, state: &mut RebuildState, event: &ChangeEvent) {
        self.stats.events_seen.fetch_add(1, Ordering::Relaxed);
        if self.filter.is_relevant(event) {
            tracing::debug!(path = %event.path.display(), kind = %event.kind, "Change detected");
            state.record_event(event.at);
        } else {
            self.stats.events_ignored.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Subscribe to `root` and spawn its watch loop.
///
/// The event source lives inside the spawned task, so the subscription ends
/// when the loop does.
///
/// # Errors
///
/// Returns an error if the subscription or the filter cannot be set up.
pub fn spawn_watch<R: BuildRunner>(
    root: impl AsRef<Path>,
    recursive: bool,
    filter_config: &FilterConfig,
    supervisor: Arc<BuildSupervisor<R>>,
    config: WatchLoopConfig,
    shutdown: CancellationToken,
) -> Result<JoinHandle<WatcherStatsSnapshot>> {
    let root = root.as_ref();
    let filter = EventFilter::for_root(root, filter_config)?;
    let (source, events) = FsEventSource::new(root, recursive)?;
    let watch_loop = WatchLoop::new(root, filter, supervisor, config);
    let span = tracing::info_span!("watch_loop", root = %root.display());

    Ok(tokio::spawn(
        async move {
            let _source = source;
            watch_loop.run(events, shutdown).await
        }
        .instrument(span),
    ))
}
