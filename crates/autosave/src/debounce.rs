//! Debounced persistence scheduler
//!
//! Coalesces bursts of edits into one deferred save. Every `update` replaces
//! the pending value and restarts the debounce timer; when the timer elapses
//! (or a caller forces a flush) the save operation runs with the latest value,
//! unless a save is already in flight.
//!
//! State transitions:
//! ```text
//! Idle             --update-->               Armed
//! Armed            --update-->               Armed (timer reset)
//! Armed            --timer / flush-->        Saving
//! Saving           --update-->               ArmedWhileSaving
//! ArmedWhileSaving --save completes-->       Armed (fresh timer)
//! Saving           --save completes-->       Idle
//! ```

use crate::config::AutosaveConfig;
use crate::error::{AutosaveError, Result};
use crate::operation::SaveOperation;
use crate::retry::Retrying;
use crate::status::{SavePhase, SaveStatus};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Handle to a save started by [`Autosaver::close`]
pub type FinalSave = JoinHandle<Result<()>>;

/// Debounced autosave scheduler for one document
///
/// Dropping the scheduler (or calling [`Autosaver::close`]) cancels the timer
/// and starts one last save of the pending value without waiting for it.
pub struct Autosaver<T: Clone + Send + 'static> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    operation: Arc<dyn SaveOperation<T>>,
    config: AutosaveConfig,
    runtime: Handle,
    state: Mutex<State<T>>,
    status_tx: watch::Sender<SaveStatus>,
}

struct State<T> {
    /// Latest value handed in, kept after saving
    pending: Option<T>,
    /// Bumped on every accepted update
    version: u64,
    /// Version currently being saved
    in_flight: Option<u64>,
    /// Version of the last successful save
    saved_version: Option<u64>,
    timer: Option<Timer>,
    next_timer_id: u64,
    closed: bool,
    saves_completed: u64,
    saves_failed: u64,
    last_saved_at: Option<Instant>,
    last_error: Option<String>,
}

struct Timer {
    id: u64,
    handle: JoinHandle<()>,
}

impl<T> State<T> {
    fn new() -> Self {
        Self {
            pending: None,
            version: 0,
            in_flight: None,
            saved_version: None,
            timer: None,
            next_timer_id: 0,
            closed: false,
            saves_completed: 0,
            saves_failed: 0,
            last_saved_at: None,
            last_error: None,
        }
    }

    fn phase(&self) -> SavePhase {
        match self.in_flight {
            Some(saving) if self.version > saving => SavePhase::ArmedWhileSaving,
            Some(_) => SavePhase::Saving,
            None if self.timer.is_some() => SavePhase::Armed,
            None => SavePhase::Idle,
        }
    }

    fn snapshot(&self) -> SaveStatus {
        SaveStatus {
            phase: self.phase(),
            has_pending: self.pending.is_some(),
            saves_completed: self.saves_completed,
            saves_failed: self.saves_failed,
            last_saved_at: self.last_saved_at,
            last_error: self.last_error.clone(),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    /// A value newer than the one being (or last) saved is waiting
    fn has_newer_than(&self, version: u64) -> bool {
        self.pending.is_some() && self.version > version
    }

    /// Count a finished save attempt
    fn record(&mut self, version: u64, outcome: &Result<()>) {
        match outcome {
            Ok(()) => {
                info!("Autosave complete (version {})", version);
                self.saved_version = Some(version);
                self.saves_completed += 1;
                self.last_saved_at = Some(Instant::now());
                self.last_error = None;
            }
            Err(e) => {
                warn!("Autosave failed (version {}): {}", version, e);
                self.saves_failed += 1;
                self.last_error = Some(e.to_string());
            }
        }
    }
}

impl<T: Clone + Send + 'static> Autosaver<T> {
    /// Create a scheduler bound to `operation`
    ///
    /// Must be called from within a tokio runtime; timers and saves are
    /// spawned onto that runtime for the scheduler's whole life.
    pub fn new<S>(operation: S, config: AutosaveConfig) -> Result<Self>
    where
        S: SaveOperation<T>,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| AutosaveError::NoRuntime)?;

        let operation: Arc<dyn SaveOperation<T>> = match config.retry.clone() {
            Some(policy) => Arc::new(Retrying::new(operation, policy)),
            None => Arc::new(operation),
        };

        let (status_tx, _) = watch::channel(SaveStatus::default());

        Ok(Self {
            inner: Arc::new(Inner {
                operation,
                config,
                runtime,
                state: Mutex::new(State::new()),
                status_tx,
            }),
        })
    }

    /// Create a scheduler with the default 10 second window
    pub fn with_defaults<S>(operation: S) -> Result<Self>
    where
        S: SaveOperation<T>,
    {
        Self::new(operation, AutosaveConfig::default())
    }

    /// Replace the pending value and restart the debounce window
    ///
    /// Never blocks, even while a save is in flight.
    pub fn update(&self, value: T) {
        let mut state = self.inner.state.lock();
        state.pending = Some(value);
        state.version += 1;
        self.inner.arm(&mut state);
        self.inner.publish(&state);
    }

    /// Like [`Autosaver::update`], ignoring an absent value
    ///
    /// `None` neither starts a timer nor clears what is already pending.
    pub fn update_opt(&self, value: Option<T>) {
        match value {
            Some(value) => self.update(value),
            None => debug!("Ignoring absent autosave value"),
        }
    }

    /// Save the pending value now
    ///
    /// Returns immediately with `Ok(())` when nothing is pending or a save is
    /// already in flight; in the latter case the pending value is picked up
    /// once the running save completes. Otherwise waits for the save and
    /// returns its outcome.
    pub async fn flush(&self) -> Result<()> {
        let save = {
            let mut state = self.inner.state.lock();
            let save = self.inner.begin_save(&mut state);
            self.inner.publish(&state);
            save
        };

        match save {
            Some(handle) => handle
                .await
                .map_err(|e| AutosaveError::TaskFailed(e.to_string()))?,
            None => Ok(()),
        }
    }

    /// Whether a save operation is executing right now
    pub fn is_saving(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// Whether a value has been handed to the scheduler
    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    pub fn phase(&self) -> SavePhase {
        self.inner.state.lock().phase()
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.state.lock().snapshot()
    }

    /// Watch status transitions
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.inner.config
    }

    /// End the editing session
    ///
    /// Cancels the timer and starts the final save of the pending value, if
    /// one is pending and no save is in flight. The returned handle may be
    /// awaited, or dropped to let the save finish in the background. When a
    /// save is in flight, the newest value is saved right after it instead.
    pub fn close(self) -> Option<FinalSave> {
        self.inner.dispose()
    }
}

impl<T: Clone + Send + 'static> Drop for Autosaver<T> {
    fn drop(&mut self) {
        // No-op after close()
        let _ = self.inner.dispose();
    }
}

impl<T: Clone + Send + 'static> Inner<T> {
    fn publish(&self, state: &State<T>) {
        self.status_tx.send_replace(state.snapshot());
    }

    /// Start (or restart) the debounce timer
    fn arm(self: &Arc<Self>, state: &mut State<T>) {
        state.cancel_timer();
        if state.closed {
            return;
        }

        let id = state.next_timer_id;
        state.next_timer_id += 1;

        let interval = self.config.interval();
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_timer(id);
            }
        });

        debug!("Autosave armed for {:?} (timer {})", interval, id);
        state.timer = Some(Timer { id, handle });
    }

    fn on_timer(self: &Arc<Self>, id: u64) {
        let mut state = self.state.lock();

        // A superseded timer must never fire
        if state.timer.as_ref().map(|timer| timer.id) != Some(id) {
            return;
        }
        state.timer = None;

        debug!("Debounce window elapsed (timer {})", id);
        // Outcome is logged by the save task
        let _ = self.begin_save(&mut state);
        self.publish(&state);
    }

    /// Start a save of the pending value unless one is running
    fn begin_save(self: &Arc<Self>, state: &mut State<T>) -> Option<JoinHandle<Result<()>>> {
        if state.in_flight.is_some() {
            debug!("Save already in flight, deferring");
            return None;
        }

        let value = match &state.pending {
            Some(value) => value.clone(),
            None => {
                debug!("Nothing pending to save");
                return None;
            }
        };

        if self.config.skip_unchanged && state.saved_version == Some(state.version) {
            debug!("Pending value already saved, skipping");
            state.cancel_timer();
            return None;
        }

        state.cancel_timer();
        let version = state.version;
        state.in_flight = Some(version);

        let inner = Arc::clone(self);
        Some(self.runtime.spawn(async move { inner.run_save(version, value).await }))
    }

    async fn run_save(self: Arc<Self>, version: u64, value: T) -> Result<()> {
        debug!("Saving version {}", version);

        // Run the operation as its own task so a panic cannot leave the
        // in-flight flag set
        let operation = Arc::clone(&self.operation);
        let mut write = self.runtime.spawn(async move { operation.save(value).await });

        let Some(limit) = self.config.save_timeout() else {
            let outcome = outcome_of(write.await);
            self.finish(version, &outcome);
            return outcome;
        };

        match tokio::time::timeout(limit, &mut write).await {
            Ok(joined) => {
                let outcome = outcome_of(joined);
                self.finish(version, &outcome);
                outcome
            }
            Err(_) => {
                let outcome = Err(AutosaveError::TimedOut(limit));
                {
                    let mut state = self.state.lock();
                    state.record(version, &outcome);
                    self.publish(&state);
                }

                // Slot stays taken until the abandoned write resolves
                let inner = Arc::clone(&self);
                self.runtime.spawn(async move {
                    let late = outcome_of(write.await);
                    inner.finish_abandoned(version, late);
                });
                outcome
            }
        }
    }

    fn finish(self: &Arc<Self>, version: u64, outcome: &Result<()>) {
        let mut state = self.state.lock();
        state.record(version, outcome);
        self.release(&mut state, version);
    }

    /// The write behind a timed-out save finally resolved
    fn finish_abandoned(self: &Arc<Self>, version: u64, outcome: Result<()>) {
        let mut state = self.state.lock();
        match outcome {
            Ok(()) => {
                info!("Timed-out save landed late (version {})", version);
                state.saved_version = Some(version);
            }
            Err(e) => warn!("Timed-out save failed late (version {}): {}", version, e),
        }
        self.release(&mut state, version);
    }

    /// Free the single-flight slot and pick up anything newer
    fn release(self: &Arc<Self>, state: &mut State<T>, version: u64) {
        state.in_flight = None;

        if state.has_newer_than(version) {
            if state.closed {
                // Deferred disposal flush
                let _ = self.begin_save(state);
            } else if state.timer.is_none() {
                self.arm(state);
            }
        }

        self.publish(state);
    }

    fn dispose(self: &Arc<Self>) -> Option<FinalSave> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.closed = true;
        state.cancel_timer();

        let save = self.begin_save(&mut state);
        if save.is_some() {
            info!("Session closing, flushing pending autosave");
        }
        self.publish(&state);
        save
    }
}

fn outcome_of(joined: std::result::Result<anyhow::Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result.map_err(AutosaveError::Save),
        Err(e) => Err(AutosaveError::TaskFailed(e.to_string())),
    }
}
