//! Per-client run locks
//!
//! At most one reconciliation pass per client at a time. The guard releases
//! the client on drop, so an aborted pass never leaves it locked.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    /// client_id -> started_at (millis)
    held: Arc<DashMap<i64, i64>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the client is already held
    pub fn try_acquire(&self, client_id: i64, now: i64) -> Option<RunGuard> {
        match self.held.entry(client_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(now);
                Some(RunGuard {
                    held: self.held.clone(),
                    client_id,
                })
            }
        }
    }

    pub fn is_held(&self, client_id: i64) -> bool {
        self.held.contains_key(&client_id)
    }

    /// Clients currently held, ascending
    pub fn running(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.held.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// When the current holder acquired the client
    pub fn held_since(&self, client_id: i64) -> Option<i64> {
        self.held.get(&client_id).map(|v| *v)
    }
}

#[derive(Debug)]
pub struct RunGuard {
    held: Arc<DashMap<i64, i64>>,
    client_id: i64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.held.remove(&self.client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let locks = RunLocks::new();
        let guard = locks.try_acquire(1, 100).unwrap();
        assert!(locks.try_acquire(1, 200).is_none());
        assert_eq!(locks.held_since(1), Some(100));

        drop(guard);
        assert!(!locks.is_held(1));
        assert!(locks.try_acquire(1, 300).is_some());
    }

    #[test]
    fn clients_are_independent() {
        let locks = RunLocks::new();
        let _a = locks.try_acquire(1, 0).unwrap();
        assert!(locks.try_acquire(2, 0).is_some());
    }
}
