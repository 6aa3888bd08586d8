//! Serializes mirror runs and tells readers whether one is active.
//!
//! The state lives behind a `tokio::sync::watch` channel: transitions are atomic
//! read-modify-writes under the channel's lock, and readers that want to wait for the end of
//! a sync block on change notifications instead of polling.
//!
//! A second lock gates the files themselves: catalog builds hold its read side for their whole
//! pass and a sync takes the write side before touching the mirror, so a sync that begins
//! mid-build waits for the build's transcodes to land before it wipes or fetches anything.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::{watch, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::Instant;

use super::types::{SyncOutcome, SyncPhase, SyncState, SyncStatus, TriggerOutcome};
use crate::error_handling::types::MirrorError;
use crate::remote_mirror::{RemoteMirror, SyncMode, SyncReport};

pub struct SyncCoordinator {
    state: watch::Sender<SyncState>,
    files: Arc<RwLock<()>>,
    mirror: Option<Arc<RemoteMirror>>,
}

impl SyncCoordinator {
    /// `mirror` is `None` when remote sync is disabled; triggers then report `Disabled`.
    pub fn new(mirror: Option<Arc<RemoteMirror>>) -> Arc<Self> {
        let (state, _) = watch::channel(SyncState::default());
        Arc::new(Self {
            state,
            files: Arc::new(RwLock::new(())),
            mirror,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.mirror.is_some()
    }

    /// Non-blocking status query.
    pub fn is_syncing(&self) -> bool {
        self.state.borrow().phase == SyncPhase::Syncing
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus::from(&*self.state.borrow())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Moves `Idle -> Syncing` and hands out the permit that owns the `Syncing` phase.
    /// Returns `None` without waiting if a sync is already running.
    pub fn try_begin(self: &Arc<Self>) -> Option<SyncPermit> {
        let acquired = self.state.send_if_modified(|state| {
            if state.phase != SyncPhase::Idle {
                return false;
            }
            state.phase = SyncPhase::Syncing;
            state.generation += 1;
            state.last_started = Some(Utc::now());
            true
        });

        acquired.then(|| SyncPermit {
            coordinator: Arc::clone(self),
            outcome: SyncOutcome::Failed,
            exclusive: None,
        })
    }

    /// Starts a mirror run in the background. Never queues and never restarts a running sync.
    pub fn trigger(self: &Arc<Self>, mode: SyncMode) -> TriggerOutcome {
        let Some(mirror) = self.mirror.clone() else {
            warn!("Sync requested but remote sync is disabled");
            return TriggerOutcome::Disabled;
        };
        let Some(permit) = self.try_begin() else {
            info!("Sync requested while another sync is running, rejecting");
            return TriggerOutcome::AlreadyInProgress;
        };

        tokio::spawn(async move {
            match mirror.sync(permit, mode).await {
                Ok(report) => info!("Background {:?} sync finished: {}", mode, report),
                Err(e) => error!("Background {:?} sync failed: {}", mode, e),
            }
        });
        TriggerOutcome::Accepted
    }

    /// Runs a mirror pass on the current task, failing fast if one is already running.
    pub async fn sync_now(self: &Arc<Self>, mode: SyncMode) -> Result<SyncReport, MirrorError> {
        let mirror = self.mirror.clone().ok_or(MirrorError::Disabled)?;
        let permit = self.try_begin().ok_or(MirrorError::AlreadySyncing)?;
        mirror.sync(permit, mode).await
    }

    /// Waits until no sync is running, for at most `timeout`. Returns whether the mirror is
    /// idle. A zero timeout only checks.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        if timeout.is_zero() {
            return rx.borrow().phase == SyncPhase::Idle;
        }
        let idle = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| s.phase == SyncPhase::Idle)).await,
            Ok(Ok(_))
        );
        idle
    }

    /// Shared access to the mirror and artifact files for one catalog build, granted only
    /// while no sync is running. Gives up after `timeout`; a zero timeout never waits.
    ///
    /// A sync may begin while the guard is held, but it cannot touch any file until the guard
    /// is dropped. [`ReadGuard::generation`] tells the holder whether that happened.
    pub async fn begin_read(&self, timeout: Duration) -> Option<ReadGuard> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.wait_idle(deadline.saturating_duration_since(Instant::now())).await {
                return None;
            }
            let files = match Arc::clone(&self.files).try_read_owned() {
                Ok(files) => files,
                Err(_) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    tokio::time::timeout(remaining, Arc::clone(&self.files).read_owned())
                        .await
                        .ok()?
                }
            };
            {
                let state = self.state.borrow();
                if state.phase == SyncPhase::Idle {
                    return Some(ReadGuard {
                        _files: files,
                        generation: state.generation,
                    });
                }
            }
            // A sync began between the idle check and the lock; it is queued behind us.
            drop(files);
            if Instant::now() >= deadline {
                return None;
            }
        }
    }

    fn finish(&self, outcome: SyncOutcome) {
        self.state.send_modify(|state| {
            state.phase = SyncPhase::Idle;
            state.last_finished = Some(Utc::now());
            state.last_outcome = Some(outcome);
        });
    }
}

/// Ownership of the `Syncing` phase. Dropping it returns the coordinator to `Idle`, whatever
/// path the sync took out; the run counts as failed unless `complete` was called.
pub struct SyncPermit {
    coordinator: Arc<SyncCoordinator>,
    outcome: SyncOutcome,
    exclusive: Option<OwnedRwLockWriteGuard<()>>,
}

impl SyncPermit {
    /// Waits for catalog builds still holding a [`ReadGuard`] to finish. No new build can
    /// start while the permit exists, so this only drains the ones already running.
    pub async fn exclusive(&mut self) {
        if self.exclusive.is_none() {
            let files = Arc::clone(&self.coordinator.files);
            self.exclusive = Some(files.write_owned().await);
        }
    }

    pub fn complete(mut self) {
        self.outcome = SyncOutcome::Completed;
    }
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.coordinator.finish(self.outcome);
    }
}

/// Shared hold on the mirror and artifact files, see [`SyncCoordinator::begin_read`].
pub struct ReadGuard {
    _files: OwnedRwLockReadGuard<()>,
    generation: u64,
}

impl ReadGuard {
    /// Sync generation observed when the guard was granted.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_rejected() {
        let coordinator = SyncCoordinator::new(None);
        let permit = coordinator.try_begin().expect("first begin succeeds");
        assert!(coordinator.is_syncing());
        assert!(coordinator.try_begin().is_none());

        drop(permit);
        assert!(!coordinator.is_syncing());
        assert!(coordinator.try_begin().is_some());
    }

    #[test]
    fn test_dropped_permit_records_failure() {
        let coordinator = SyncCoordinator::new(None);
        drop(coordinator.try_begin().unwrap());

        let status = coordinator.status();
        assert!(!status.syncing);
        assert!(status.last_started.is_some());
        assert!(status.last_finished.is_some());
        assert_eq!(status.last_outcome, Some(SyncOutcome::Failed));
    }

    #[test]
    fn test_completed_permit_records_success() {
        let coordinator = SyncCoordinator::new(None);
        coordinator.try_begin().unwrap().complete();
        assert_eq!(coordinator.status().last_outcome, Some(SyncOutcome::Completed));
        assert!(!coordinator.is_syncing());
    }

    #[test]
    fn test_generation_advances_per_sync() {
        let coordinator = SyncCoordinator::new(None);
        let before = coordinator.generation();
        drop(coordinator.try_begin().unwrap());
        drop(coordinator.try_begin().unwrap());
        assert_eq!(coordinator.generation(), before + 2);
    }

    #[test]
    fn test_trigger_without_mirror_is_disabled() {
        let coordinator = SyncCoordinator::new(None);
        assert!(!coordinator.is_enabled());
        assert_eq!(coordinator.trigger(SyncMode::Incremental), TriggerOutcome::Disabled);
        assert!(!coordinator.is_syncing());
    }

    #[tokio::test]
    async fn test_sync_now_without_mirror_is_disabled() {
        let coordinator = SyncCoordinator::new(None);
        let err = coordinator.sync_now(SyncMode::Full).await.unwrap_err();
        assert!(matches!(err, MirrorError::Disabled));
    }

    #[tokio::test]
    async fn test_wait_idle_zero_timeout_does_not_block() {
        let coordinator = SyncCoordinator::new(None);
        assert!(coordinator.wait_idle(Duration::ZERO).await);

        let _permit = coordinator.try_begin().unwrap();
        assert!(!coordinator.wait_idle(Duration::ZERO).await);
    }

    #[tokio::test]
    async fn test_wait_idle_times_out_while_syncing() {
        let coordinator = SyncCoordinator::new(None);
        let _permit = coordinator.try_begin().unwrap();
        assert!(!coordinator.wait_idle(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_wait_idle_wakes_on_release() {
        let coordinator = SyncCoordinator::new(None);
        let permit = coordinator.try_begin().unwrap();

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.wait_idle(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        permit.complete();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_begin_read_refused_while_syncing() {
        let coordinator = SyncCoordinator::new(None);
        let permit = coordinator.try_begin().unwrap();
        assert!(coordinator.begin_read(Duration::ZERO).await.is_none());
        assert!(coordinator.begin_read(Duration::from_millis(30)).await.is_none());

        drop(permit);
        let guard = coordinator.begin_read(Duration::ZERO).await.unwrap();
        assert_eq!(guard.generation(), coordinator.generation());
    }

    #[tokio::test]
    async fn test_readers_share_the_files() {
        let coordinator = SyncCoordinator::new(None);
        let first = coordinator.begin_read(Duration::ZERO).await.unwrap();
        let second = coordinator.begin_read(Duration::ZERO).await.unwrap();
        assert_eq!(first.generation(), second.generation());
    }

    #[tokio::test]
    async fn test_sync_waits_for_running_reader() {
        let coordinator = SyncCoordinator::new(None);
        let reader = coordinator.begin_read(Duration::ZERO).await.unwrap();
        let mut permit = coordinator.try_begin().unwrap();

        let writer = tokio::spawn(async move {
            permit.exclusive().await;
            permit
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished());
        assert_ne!(reader.generation(), coordinator.generation());

        drop(reader);
        let permit = tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .expect("sync gets the files once the reader is done")
            .unwrap();
        assert!(coordinator.begin_read(Duration::ZERO).await.is_none());
        drop(permit);
        assert!(coordinator.begin_read(Duration::ZERO).await.is_some());
    }

    #[tokio::test]
    async fn test_waiting_reader_gets_files_after_sync() {
        let coordinator = SyncCoordinator::new(None);
        let mut permit = coordinator.try_begin().unwrap();
        permit.exclusive().await;

        let reader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.begin_read(Duration::from_secs(5)).await.map(|g| g.generation()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        permit.complete();

        assert_eq!(reader.await.unwrap(), Some(coordinator.generation()));
    }
}
