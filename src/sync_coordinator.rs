//! Mirror concurrency guard.
//!
//! Exactly one mirror run at a time, and a status readers consult before building a
//! catalog. See [`SyncCoordinator`].

pub mod coordinator;
pub mod types;

pub use coordinator::{ReadGuard, SyncCoordinator, SyncPermit};
pub use types::{SyncOutcome, SyncPhase, SyncStatus, TriggerOutcome};
