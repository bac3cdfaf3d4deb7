//! End-to-end scheduler scenarios on a paused clock
//!
//! Each test drives the tokio clock by sleeping; with `start_paused` the
//! runtime jumps straight to the next timer once every task is idle.

use autosave::{AutosaveConfig, AutosaveError, Autosaver, RetryPolicy, SavePhase, SaveOperation};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Save operation double that records every call
struct Probe {
    start: Instant,
    calls: Mutex<Vec<(char, Duration)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    gated: AtomicBool,
    gate: Semaphore,
    fail_on: Mutex<Option<char>>,
    fail_next: AtomicUsize,
}

impl Probe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
            fail_on: Mutex::new(None),
            fail_next: AtomicUsize::new(0),
        })
    }

    /// Saves block until `open` is called
    fn gated() -> Arc<Self> {
        let probe = Self::new();
        probe.gated.store(true, Ordering::SeqCst);
        probe
    }

    fn open(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.add_permits(1);
    }

    fn values(&self) -> Vec<char> {
        self.calls.lock().iter().map(|(value, _)| *value).collect()
    }

    fn call_times(&self) -> Vec<Duration> {
        self.calls.lock().iter().map(|(_, at)| *at).collect()
    }

    fn op(self: &Arc<Self>) -> impl SaveOperation<char> {
        let probe = Arc::clone(self);
        move |value: char| {
            let probe = Arc::clone(&probe);
            async move { probe.save(value).await }
        }
    }

    async fn save(&self, value: char) -> anyhow::Result<()> {
        self.calls.lock().push((value, self.start.elapsed()));
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if self.gated.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if *self.fail_on.lock() == Some(value) {
            anyhow::bail!("store rejected {}", value);
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("transient store error");
        }
        Ok(())
    }
}

fn ten_seconds() -> AutosaveConfig {
    AutosaveConfig::default().with_interval(Duration::from_secs(10))
}

async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Let spawned tasks run without meaningfully moving the clock
async fn settle() {
    advance(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_updates_coalesces_into_one_save() {
    let probe = Probe::new();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    for digit in 0..10 {
        saver.update(char::from_digit(digit, 10).unwrap());
        advance(Duration::from_millis(500)).await;
    }

    // Last update at 4.5s, so nothing before 14.5s
    advance(Duration::from_millis(9_400)).await;
    assert!(probe.values().is_empty());

    advance(Duration::from_millis(200)).await;
    assert_eq!(probe.values(), vec!['9']);
}

#[tokio::test(start_paused = true)]
async fn test_update_restarts_debounce_window() {
    // update(A) at 0s, update(B) at 3s, interval 10s
    let probe = Probe::new();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('A');
    advance(Duration::from_secs(3)).await;
    saver.update('B');

    advance(Duration::from_secs(9)).await;
    assert!(probe.values().is_empty(), "nothing saved at 12s");

    advance(Duration::from_secs(2)).await;
    assert_eq!(probe.values(), vec!['B']);

    let saved_at = probe.call_times()[0];
    assert!(saved_at >= Duration::from_secs(13));
    assert!(saved_at < Duration::from_millis(13_050));
}

#[tokio::test(start_paused = true)]
async fn test_forced_flush_preempts_timer() {
    // update(A) at 0s, flush at 2s, no second save at 10s
    let probe = Probe::new();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('A');
    advance(Duration::from_secs(2)).await;
    saver.flush().await.unwrap();

    assert_eq!(probe.values(), vec!['A']);
    let saved_at = probe.call_times()[0];
    assert!(saved_at >= Duration::from_secs(2) && saved_at < Duration::from_secs(3));

    advance(Duration::from_secs(20)).await;
    assert_eq!(probe.values(), vec!['A']);
    assert_eq!(saver.phase(), SavePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_update_during_slow_save_is_saved_next() {
    let probe = Probe::gated();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('A');
    advance(Duration::from_millis(10_001)).await;
    assert!(saver.is_saving());
    assert_eq!(saver.phase(), SavePhase::Saving);

    saver.update('B');
    assert_eq!(saver.phase(), SavePhase::ArmedWhileSaving);
    assert!(saver.is_saving());

    // B's window elapses while A is still in flight: deferred, not started
    advance(Duration::from_secs(11)).await;
    assert_eq!(probe.values(), vec!['A']);

    probe.open();
    settle().await;
    assert!(!saver.is_saving());
    assert_eq!(saver.phase(), SavePhase::Armed);

    advance(Duration::from_secs(11)).await;
    assert_eq!(probe.values(), vec!['A', 'B']);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_flush_while_saving_does_not_start_second_save() {
    let probe = Probe::gated();
    let saver = Arc::new(Autosaver::new(probe.op(), ten_seconds()).unwrap());

    saver.update('A');
    let background = Arc::clone(&saver);
    let first = tokio::spawn(async move { background.flush().await });
    settle().await;
    assert!(saver.is_saving());

    saver.update('B');
    for _ in 0..3 {
        saver.flush().await.unwrap();
    }
    assert_eq!(probe.values(), vec!['A']);

    probe.open();
    first.await.unwrap().unwrap();

    // B survived the deferred flushes and goes out on the fresh timer
    advance(Duration::from_secs(11)).await;
    assert_eq!(probe.values(), vec!['A', 'B']);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_flush_with_nothing_pending_is_noop() {
    let probe = Probe::new();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    for _ in 0..5 {
        saver.flush().await.unwrap();
    }

    assert!(probe.values().is_empty());
    assert_eq!(saver.status().saves_completed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_flushes_pending_value_once() {
    let probe = Probe::new();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('C');
    drop(saver);
    settle().await;
    assert_eq!(probe.values(), vec!['C']);

    advance(Duration::from_secs(30)).await;
    assert_eq!(probe.values(), vec!['C']);
}

#[tokio::test(start_paused = true)]
async fn test_close_returns_awaitable_final_save() {
    let probe = Probe::new();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('C');
    let final_save = saver.close().unwrap();
    final_save.await.unwrap().unwrap();

    assert_eq!(probe.values(), vec!['C']);
}

#[tokio::test(start_paused = true)]
async fn test_close_while_saving_saves_newest_after_in_flight() {
    let probe = Probe::gated();
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('A');
    advance(Duration::from_millis(10_001)).await;
    saver.update('B');

    assert!(saver.close().is_none());
    assert_eq!(probe.values(), vec!['A']);

    probe.open();
    settle().await;
    assert_eq!(probe.values(), vec!['A', 'B']);

    advance(Duration::from_secs(30)).await;
    assert_eq!(probe.values(), vec!['A', 'B']);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_clears_flag_and_keeps_value() {
    let probe = Probe::new();
    *probe.fail_on.lock() = Some('D');
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();
    let mut status_rx = saver.subscribe();

    saver.update('D');
    let err = saver.flush().await.unwrap_err();
    assert!(matches!(err, AutosaveError::Save(_)));
    assert!(err.to_string().contains("store rejected D"));

    assert!(!saver.is_saving());
    assert!(saver.has_pending());
    // Held but not scheduled
    assert_eq!(saver.phase(), SavePhase::Idle);
    let status = status_rx.borrow_and_update().clone();
    assert_eq!(status.saves_failed, 1);
    assert_eq!(status.saves_completed, 0);
    assert!(status.last_error.is_some());

    // No automatic retry
    advance(Duration::from_secs(60)).await;
    assert_eq!(probe.values(), vec!['D']);

    // The next trigger tries again with what is pending
    *probe.fail_on.lock() = None;
    saver.flush().await.unwrap();
    assert_eq!(probe.values(), vec!['D', 'D']);
    assert_eq!(saver.status().last_error, None);
}

#[tokio::test(start_paused = true)]
async fn test_timer_driven_failure_is_contained() {
    let probe = Probe::new();
    *probe.fail_on.lock() = Some('E');
    let saver = Autosaver::new(probe.op(), ten_seconds()).unwrap();

    saver.update('E');
    advance(Duration::from_secs(11)).await;

    assert_eq!(probe.values(), vec!['E']);
    assert!(!saver.is_saving());
    assert_eq!(saver.phase(), SavePhase::Idle);
    assert_eq!(saver.status().saves_failed, 1);

    saver.update('F');
    advance(Duration::from_secs(11)).await;
    assert_eq!(probe.values(), vec!['E', 'F']);
    assert_eq!(saver.status().saves_completed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_save_holds_slot_until_write_lands() {
    let probe = Probe::gated();
    let config = ten_seconds().with_save_timeout(Duration::from_secs(1));
    let saver = Autosaver::new(probe.op(), config).unwrap();

    saver.update('A');
    let err = saver.flush().await.unwrap_err();
    assert!(matches!(err, AutosaveError::TimedOut(_)));
    assert_eq!(saver.status().saves_failed, 1);
    assert!(saver.is_saving());

    // A's write is still running, so B must wait behind it
    saver.update('B');
    saver.flush().await.unwrap();
    advance(Duration::from_secs(11)).await;
    assert_eq!(probe.values(), vec!['A']);
    assert_eq!(saver.phase(), SavePhase::ArmedWhileSaving);

    probe.open();
    settle().await;
    assert!(!saver.is_saving());
    assert_eq!(saver.phase(), SavePhase::Armed);

    advance(Duration::from_secs(11)).await;
    assert_eq!(probe.values(), vec!['A', 'B']);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);

    let status = saver.status();
    assert_eq!(status.saves_completed, 1);
    assert_eq!(status.saves_failed, 1);
    assert_eq!(status.phase, SavePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_close_after_timeout_saves_newest_once_write_lands() {
    let probe = Probe::gated();
    let config = ten_seconds().with_save_timeout(Duration::from_secs(1));
    let saver = Autosaver::new(probe.op(), config).unwrap();

    saver.update('A');
    assert!(saver.flush().await.is_err());
    saver.update('B');
    assert!(saver.close().is_none());

    advance(Duration::from_secs(30)).await;
    assert_eq!(probe.values(), vec!['A']);

    probe.open();
    settle().await;
    assert_eq!(probe.values(), vec!['A', 'B']);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_configured_retry_recovers_within_one_attempt() {
    let probe = Probe::new();
    probe.fail_next.store(2, Ordering::SeqCst);
    let config = ten_seconds().with_retry(RetryPolicy::new(3, Duration::from_millis(100)));
    let saver = Autosaver::new(probe.op(), config).unwrap();

    saver.update('R');
    saver.flush().await.unwrap();

    assert_eq!(probe.values(), vec!['R', 'R', 'R']);
    let status = saver.status();
    assert_eq!(status.saves_completed, 1);
    assert_eq!(status.saves_failed, 0);
}
