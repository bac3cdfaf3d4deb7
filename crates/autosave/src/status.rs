//! Observable scheduler status

use tokio::time::Instant;

/// Where the scheduler sits in its save cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavePhase {
    /// No timer running and no save in flight
    ///
    /// The last value stays held after a save (successful or not), so
    /// `has_pending` can be true here. Nothing is scheduled for it until the
    /// next update or flush.
    #[default]
    Idle,
    /// A debounce timer is running for the pending value
    Armed,
    /// A save is in flight and nothing newer has arrived
    Saving,
    /// A save is in flight and a newer value is waiting behind it
    ArmedWhileSaving,
}

impl SavePhase {
    pub fn is_saving(self) -> bool {
        matches!(self, SavePhase::Saving | SavePhase::ArmedWhileSaving)
    }
}

/// Snapshot published on every state transition
///
/// Editors use this for "Saving…" / "Saved" indicators. A save that fails
/// shows up as `saves_failed` moving while `saves_completed` does not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatus {
    pub phase: SavePhase,
    /// A value has been handed to the scheduler (kept after saving)
    pub has_pending: bool,
    pub saves_completed: u64,
    pub saves_failed: u64,
    pub last_saved_at: Option<Instant>,
    pub last_error: Option<String>,
}

impl SaveStatus {
    pub fn is_saving(&self) -> bool {
        self.phase.is_saving()
    }
}
