//! In-Flight Fetch Table
//!
//! Coalesces concurrent misses for the same quote: the first caller for a key
//! runs the fetch, everyone who arrives while it runs receives a clone of its
//! outcome, success or failure.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

// == In-Flight Table ==
/// Map of key to the shared outcome cell of the fetch currently running for it.
#[derive(Debug)]
pub struct InFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

/// One caller's interest in a slot. Dropping it, on completion or on
/// cancellation, forgets the slot once it is settled or nobody else holds it.
struct Interest<'a, K: Eq + Hash, V> {
    table: &'a InFlight<K, V>,
    key: K,
    cell: Arc<OnceCell<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> InFlight<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    // == Run ==
    /// Runs `init` for `key` unless a run is already in progress, in which
    /// case waits for that run and returns a clone of its result.
    ///
    /// If the running caller is cancelled before finishing, one of the waiters
    /// starts its own `init` in its place.
    pub async fn run<F, Fut>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(key.clone()).or_default().clone()
        };
        let interest = Interest {
            table: self,
            key,
            cell,
        };

        let outcome = interest.cell.get_or_init(init).await.clone();
        outcome
    }

    /// Number of keys with a run in progress.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for InFlight<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> Drop for Interest<'_, K, V> {
    fn drop(&mut self) {
        let mut slots = self.table.slots.lock().unwrap_or_else(|e| e.into_inner());
        let Some(current) = slots.get(&self.key) else {
            return;
        };
        if !Arc::ptr_eq(current, &self.cell) {
            return;
        }
        // Settled slots must not outlive the run, or later misses would be
        // served a stale outcome. One reference in the map, one here: no
        // waiters left to take over an unsettled slot.
        if self.cell.initialized() || Arc::strong_count(&self.cell) == 2 {
            slots.remove(&self.key);
        }
    }
}
