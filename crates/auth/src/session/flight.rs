//! Per-key single-flight guard.
//!
//! Holding a [`FlightGuard`] for a key excludes every other holder of the same
//! key. Entries are dropped from the table when the last interested task
//! releases, so the table only grows with concurrently contended keys.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Table<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// A table of async locks keyed by `K`.
pub struct SingleFlight<K: Eq + Hash + Clone> {
    locks: Table<K>,
}

impl<K: Eq + Hash + Clone> SingleFlight<K> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits until no other task holds `key`, then holds it.
    pub async fn acquire(&self, key: &K) -> FlightGuard<K> {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        FlightGuard {
            key: key.clone(),
            guard: Some(guard),
            table: Arc::clone(&self.locks),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn in_flight(&self) -> usize {
        self.locks.lock().len()
    }
}

impl<K: Eq + Hash + Clone> Default for SingleFlight<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on one key; released on drop.
pub struct FlightGuard<K: Eq + Hash + Clone> {
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    table: Table<K>,
}

impl<K: Eq + Hash + Clone> Drop for FlightGuard<K> {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let mut locks = self.table.lock();
        // table + this guard; any more means someone is waiting
        let idle = locks
            .get(&self.key)
            .is_some_and(|entry| {
                Arc::ptr_eq(entry, OwnedMutexGuard::mutex(&guard)) && Arc::strong_count(entry) == 2
            });
        if idle {
            locks.remove(&self.key);
        }
        drop(guard);
    }
}
