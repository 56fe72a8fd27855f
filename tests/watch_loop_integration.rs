//! Timing scenarios for the debounced rebuild loop.
//!
//! All tests run on tokio's paused clock, so time only advances when every
//! task is idle and the timings below are exact.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use devloop::build::{BuildResult, BuildRunner, BuildSupervisor};
use devloop::error::BuildError;
use devloop::watcher::{
    ChangeEvent, ChangeKind, DebouncePolicy, EventFilter, SourceEvent, WatchLoop,
    WatchLoopConfig, WatcherStatsSnapshot,
};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// Runner that records when each build ran.
struct RecordingRunner {
    build_time: Duration,
    outcomes: Mutex<VecDeque<bool>>,
    runs: Mutex<Vec<(Instant, Instant)>>,
}

impl RecordingRunner {
    fn new(build_time: Duration) -> Self {
        Self {
            build_time,
            outcomes: Mutex::new(VecDeque::new()),
            runs: Mutex::new(Vec::new()),
        }
    }

    fn with_outcomes(build_time: Duration, outcomes: &[bool]) -> Self {
        let runner = Self::new(build_time);
        runner.outcomes.lock().extend(outcomes.iter().copied());
        runner
    }

    fn runs(&self) -> Vec<(Instant, Instant)> {
        self.runs.lock().clone()
    }
}

impl BuildRunner for RecordingRunner {
    async fn run(&self) -> BuildResult {
        let start = Instant::now();
        sleep(self.build_time).await;
        let end = Instant::now();
        self.runs.lock().push((start, end));

        let succeeded = self.outcomes.lock().pop_front().unwrap_or(true);
        if succeeded {
            BuildResult::success("", "", end - start)
        } else {
            BuildResult::failure(BuildError::Exit { code: 1 }, "", "error", end - start)
        }
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn write(path: &str) -> SourceEvent {
    SourceEvent::Change(ChangeEvent::new(path, ChangeKind::Write))
}

fn spawn_loop(
    root: &str,
    supervisor: &Arc<BuildSupervisor<RecordingRunner>>,
    policy: DebouncePolicy,
) -> (UnboundedSender<SourceEvent>, JoinHandle<WatcherStatsSnapshot>) {
    let config = WatchLoopConfig {
        tick: ms(100),
        debounce: ms(200),
        policy,
    };
    let watch_loop = WatchLoop::new(root, EventFilter::default(), Arc::clone(supervisor), config);
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(watch_loop.run(rx, CancellationToken::new()));
    (tx, handle)
}

/// Close the event channel and wait for the loop to flush and exit.
async fn finish(
    tx: UnboundedSender<SourceEvent>,
    handle: JoinHandle<WatcherStatsSnapshot>,
) -> WatcherStatsSnapshot {
    drop(tx);
    handle.await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_single_event_builds_after_threshold() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(50))));
    let t0 = Instant::now();
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastBuild);

    tx.send(write("/src/a.txt")).unwrap();

    sleep(ms(250)).await;
    assert!(supervisor.runner().runs().is_empty(), "built before threshold");

    sleep(ms(750)).await;
    let stats = finish(tx, handle).await;

    let runs = supervisor.runner().runs();
    assert_eq!(runs.len(), 1);
    let offset = runs[0].0 - t0;
    assert!(offset >= ms(200), "built at {offset:?}");
    assert!(offset <= ms(300), "built at {offset:?}");
    assert_eq!(stats.builds_started, 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_since_last_build() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(50))));
    let t0 = Instant::now();
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastBuild);

    for _ in 0..4 {
        tx.send(write("/src/a.txt")).unwrap();
        sleep(ms(50)).await;
    }
    sleep(ms(1000)).await;
    let stats = finish(tx, handle).await;

    let runs = supervisor.runner().runs();
    assert_eq!(runs.len(), 1);
    // Window runs from loop start: first tick strictly past 200ms.
    let offset = runs[0].0 - t0;
    assert!(offset > ms(200), "built at {offset:?}");
    assert!(offset <= ms(300), "built at {offset:?}");
    assert_eq!(stats.events_seen, 4);
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_since_last_event() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(50))));
    let t0 = Instant::now();
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastEvent);

    for _ in 0..4 {
        tx.send(write("/src/a.txt")).unwrap();
        sleep(ms(50)).await;
    }
    sleep(ms(1000)).await;
    finish(tx, handle).await;

    let runs = supervisor.runner().runs();
    assert_eq!(runs.len(), 1);
    let offset = runs[0].0 - t0;
    assert!(offset >= ms(350), "built at {offset:?}");
    assert!(offset <= ms(400), "built at {offset:?}");
}

#[tokio::test(start_paused = true)]
async fn test_noise_never_builds() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(50))));
    let (tx, handle) = spawn_loop("/out", &supervisor, DebouncePolicy::SinceLastBuild);

    for kind in [
        ChangeKind::Create,
        ChangeKind::Write,
        ChangeKind::Remove,
        ChangeKind::Rename,
        ChangeKind::Other,
    ] {
        tx.send(SourceEvent::Change(ChangeEvent::new("/out/build.bck", kind)))
            .unwrap();
    }
    tx.send(write("/out/public")).unwrap();

    sleep(ms(2000)).await;
    let stats = finish(tx, handle).await;

    assert!(supervisor.runner().runs().is_empty());
    assert_eq!(stats.events_seen, 6);
    assert_eq!(stats.events_ignored, 6);
    assert_eq!(stats.builds_started, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_does_not_lock_up() {
    let runner = RecordingRunner::with_outcomes(ms(50), &[false, true]);
    let supervisor = Arc::new(BuildSupervisor::new(runner));
    let t0 = Instant::now();
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastBuild);

    tx.send(write("/src/a.txt")).unwrap();
    sleep(ms(500)).await;
    assert_eq!(supervisor.runner().runs().len(), 1);

    tx.send(write("/src/a.txt")).unwrap();
    sleep(ms(1000)).await;
    let stats = finish(tx, handle).await;

    let runs = supervisor.runner().runs();
    assert_eq!(runs.len(), 2);
    assert!(runs[1].0 - t0 >= ms(500));
    assert_eq!(stats.builds_started, 2);
    assert_eq!(stats.builds_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shared_supervisor_serializes_roots() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(150))));
    let (tx_a, handle_a) = spawn_loop("/game", &supervisor, DebouncePolicy::SinceLastBuild);
    let (tx_b, handle_b) = spawn_loop("/shared", &supervisor, DebouncePolicy::SinceLastBuild);

    tx_a.send(write("/game/main.odin")).unwrap();
    tx_b.send(write("/shared/input.odin")).unwrap();

    sleep(ms(1500)).await;
    let stats_a = finish(tx_a, handle_a).await;
    let stats_b = finish(tx_b, handle_b).await;

    let mut runs = supervisor.runner().runs();
    runs.sort_by_key(|(start, _)| *start);
    assert_eq!(runs.len(), 2);
    assert!(runs[1].0 >= runs[0].1, "builds overlapped: {runs:?}");
    assert_eq!(supervisor.attempts(), 2);
    assert_eq!(stats_a.builds_started + stats_b.builds_started, 2);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_events_build_once() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(50))));
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastBuild);

    let event = write("/src/a.txt");
    for _ in 0..20 {
        tx.send(event.clone()).unwrap();
    }
    sleep(ms(1000)).await;
    let stats = finish(tx, handle).await;

    assert_eq!(supervisor.runner().runs().len(), 1);
    assert_eq!(stats.events_seen, 20);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_edits_are_not_starved() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(10))));
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastBuild);

    for _ in 0..20 {
        tx.send(write("/src/a.txt")).unwrap();
        sleep(ms(50)).await;
    }
    sleep(ms(500)).await;
    finish(tx, handle).await;

    assert!(supervisor.runner().runs().len() >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_edits_wait_for_quiet() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(10))));
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastEvent);

    for _ in 0..20 {
        tx.send(write("/src/a.txt")).unwrap();
        sleep(ms(50)).await;
    }
    sleep(ms(500)).await;
    finish(tx, handle).await;

    assert_eq!(supervisor.runner().runs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_event_during_build_triggers_another() {
    let supervisor = Arc::new(BuildSupervisor::new(RecordingRunner::new(ms(250))));
    let (tx, handle) = spawn_loop("/src", &supervisor, DebouncePolicy::SinceLastBuild);

    tx.send(write("/src/a.txt")).unwrap();
    sleep(ms(400)).await;
    assert_eq!(supervisor.runner().runs().len(), 0, "first build still running");
    tx.send(write("/src/b.txt")).unwrap();

    sleep(ms(1500)).await;
    finish(tx, handle).await;

    let runs = supervisor.runner().runs();
    assert_eq!(runs.len(), 2);
    assert!(runs[1].0 >= runs[0].1);
}
