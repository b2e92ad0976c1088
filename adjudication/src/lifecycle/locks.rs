//! Per-match serialization of read-modify-write cycles
//!
//! Every mutating controller operation holds its match's lock from the
//! store read through the final store write, so exactly one submission can
//! observe the third-scorecard transition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry size above which idle locks are pruned on acquire
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of async mutexes keyed by match id
#[derive(Default)]
pub struct MatchLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a match
    pub async fn acquire(&self, match_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                // Only the registry holds an idle lock
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry(match_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of matches with a registered lock
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
