//! Debounce bookkeeping for a single watch loop.
//!
//! `RebuildState` turns any number of relevant events into a single pending
//! flag and decides, on each tick, whether a build should be launched now.

use std::time::Duration;

use tokio::time::Instant;

/// Minimum time between a pending change and the next build.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Interval at which the debounce condition is evaluated.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// What the debounce window is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DebouncePolicy {
    /// Window runs from the last build launch. Continuous edits still
    /// rebuild at most once per window.
    #[default]
    SinceLastBuild,
    /// Window runs from the most recent relevant event (quiet period).
    SinceLastEvent,
}

/// Observable phase of a watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// No pending change.
    Idle,
    /// A change was seen and the window has not elapsed yet.
    PendingDebounce,
}

/// Pending-rebuild state owned by one watch loop.
#[derive(Debug, Clone)]
pub struct RebuildState {
    pending: bool,
    last_build: Instant,
    last_event: Option<Instant>,
    threshold: Duration,
    policy: DebouncePolicy,
}

impl RebuildState {
    /// Create an idle state. `now` counts as the last build time.
    #[must_use]
    pub const fn new(threshold: Duration, policy: DebouncePolicy, now: Instant) -> Self {
        Self {
            pending: false,
            last_build: now,
            last_event: None,
            threshold,
            policy,
        }
    }

    /// Record a relevant change observed at `at`.
    pub fn record_event(&mut self, at: Instant) {
        self.pending = true;
        self.last_event = Some(self.last_event.map_or(at, |prev| prev.max(at)));
    }

    /// Whether a rebuild is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Time of the last build launch.
    #[must_use]
    pub const fn last_build(&self) -> Instant {
        self.last_build
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> LoopPhase {
        if self.pending {
            LoopPhase::PendingDebounce
        } else {
            LoopPhase::Idle
        }
    }

    /// Check the debounce condition without changing state.
    #[must_use]
    pub fn is_ready(&self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        let since = match self.policy {
            DebouncePolicy::SinceLastBuild => self.last_build,
            DebouncePolicy::SinceLastEvent => self.last_event.unwrap_or(self.last_build),
        };
        now.saturating_duration_since(since) > self.threshold
    }

    /// Claim a build if the debounce condition holds.
    ///
    /// On success the pending flag is cleared and `now` becomes the last
    /// build time; the caller must then run the build.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        self.pending = false;
        self.last_build = now;
        true
    }
}
