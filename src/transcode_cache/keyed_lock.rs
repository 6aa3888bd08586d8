use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use and dropped once nobody holds or awaits it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other guard for `key` is alive.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = Arc::clone(
            self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        // Cleans up after a waiter whose future is dropped before it gets the lock.
        let waiting = Waiting {
            owner: self,
            key,
            mutex: Some(Arc::clone(&mutex)),
        };
        let guard = mutex.lock_owned().await;
        drop(waiting);
        KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn release(&self, key: &str) {
        // Waiters and holders each keep a clone of the Arc, so a count of one means only
        // the map is left.
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

struct Waiting<'a> {
    owner: &'a KeyedLocks,
    key: &'a str,
    mutex: Option<Arc<Mutex<()>>>,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.mutex.take();
        self.owner.release(self.key);
    }
}

pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.owner.release(&self.key);
    }
}
