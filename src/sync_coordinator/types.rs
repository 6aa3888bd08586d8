use chrono::{DateTime, Utc};
use serde::Serialize;

/// Mirror activity. `Idle -> Syncing -> Idle`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Syncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Completed,
    Failed,
}

/// What `trigger` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    Accepted,
    AlreadyInProgress,
    Disabled,
}

/// Process-wide sync state, only ever modified under the coordinator's lock.
#[derive(Debug, Clone)]
pub(crate) struct SyncState {
    pub phase: SyncPhase,
    /// Bumped every time a sync begins; lets readers detect a sync that started and
    /// finished while they were not looking.
    pub generation: u64,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    pub last_outcome: Option<SyncOutcome>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Idle,
            generation: 0,
            last_started: None,
            last_finished: None,
            last_outcome: None,
        }
    }
}

/// Snapshot served by `GET /sync-status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub syncing: bool,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    pub last_outcome: Option<SyncOutcome>,
}

impl From<&SyncState> for SyncStatus {
    fn from(state: &SyncState) -> Self {
        Self {
            syncing: state.phase == SyncPhase::Syncing,
            last_started: state.last_started,
            last_finished: state.last_finished,
            last_outcome: state.last_outcome,
        }
    }
}
