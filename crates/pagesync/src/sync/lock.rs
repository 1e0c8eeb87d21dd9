//! Per-config run locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::types::LockPolicy;

type LockTable = Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>;

/// Keeps at most one run per config id in flight.
///
/// Cloning shares the lock table. An entry lives only while a run holds it
/// or waits on it.
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    locks: LockTable,
}

/// Held for the duration of a run.
#[derive(Debug)]
pub struct RunGuard {
    config_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // Waiters hold their own clone, so a count of one means nobody else wants it.
        if locks
            .get(&self.config_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.config_id);
        }
    }
}

impl RunGuard {
    #[must_use]
    pub fn config_id(&self) -> Uuid {
        self.config_id
    }
}

impl RunLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, config_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(config_id).or_default())
    }

    /// Take the lock for `config_id`. Under [`LockPolicy::Reject`] returns
    /// `None` when a run is already in progress.
    pub async fn acquire(&self, config_id: Uuid, policy: LockPolicy) -> Option<RunGuard> {
        let lock = self.lock_for(config_id);
        let guard = match policy {
            LockPolicy::Reject => lock.try_lock_owned().ok()?,
            LockPolicy::Wait => lock.lock_owned().await,
        };
        Some(RunGuard {
            config_id,
            guard: Some(guard),
            table: Arc::clone(&self.locks),
        })
    }

    /// Whether a run for `config_id` is in progress.
    #[must_use]
    pub fn is_running(&self, config_id: Uuid) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .get(&config_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of config ids currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn reject_policy_refuses_second_holder() {
        let locks = RunLocks::new();
        let id = Uuid::new_v4();

        let guard = locks.acquire(id, LockPolicy::Reject).await.expect("first");
        assert_eq!(guard.config_id(), id);
        assert!(locks.is_running(id));
        assert!(locks.acquire(id, LockPolicy::Reject).await.is_none());

        // Other configs are unaffected.
        assert!(locks.acquire(Uuid::new_v4(), LockPolicy::Reject).await.is_some());

        drop(guard);
        assert!(!locks.is_running(id));
        assert!(locks.acquire(id, LockPolicy::Reject).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_policy_queues_until_release() {
        let locks = RunLocks::new();
        let id = Uuid::new_v4();
        let guard = locks.acquire(id, LockPolicy::Wait).await.expect("first");

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(id, LockPolicy::Wait).await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.await.expect("waiter task"));
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn finished_runs_leave_no_entries_behind() {
        let locks = RunLocks::new();

        for _ in 0..100 {
            let guard = locks
                .acquire(Uuid::new_v4(), LockPolicy::Reject)
                .await
                .expect("free");
            assert_eq!(locks.tracked(), 1);
            drop(guard);
        }
        assert_eq!(locks.tracked(), 0);

        let id = Uuid::new_v4();
        let first = locks.acquire(id, LockPolicy::Reject).await.expect("first");
        assert!(locks.acquire(id, LockPolicy::Reject).await.is_none());
        assert_eq!(locks.tracked(), 1);
        drop(first);
        assert_eq!(locks.tracked(), 0);
        assert!(!locks.is_running(id));
    }
}
