//! Per-record write locks.
//!
//! Every mutation of a status record happens while holding that record's lock, so there is only ever one writer per
//! record. Operations that touch several records take all of their locks up front, always in sorted order, so two
//! operations can never each hold a lock the other is waiting for.
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use log::*;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::status_types::StatusKind;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockKey(StatusKind, String);

impl LockKey {
    pub fn new<S: ToString>(kind: StatusKind, id: &S) -> Self {
        Self(kind, id.to_string())
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Holds a set of record locks. They are released when this is dropped.
#[derive(Debug)]
pub struct LockSet {
    keys: BTreeSet<LockKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    pub fn holds(&self, key: &LockKey) -> bool {
        self.keys.contains(key)
    }

    pub fn holds_all<'a, I: IntoIterator<Item = &'a LockKey>>(&self, keys: I) -> bool {
        keys.into_iter().all(|k| self.holds(k))
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for, and takes, the lock of every key in `keys`. Duplicates are ignored.
    pub async fn lock_all<I: IntoIterator<Item = LockKey>>(&self, keys: I) -> LockSet {
        let keys = keys.into_iter().collect::<BTreeSet<LockKey>>();
        let mutexes = self.mutexes_for(&keys);
        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        trace!("🚗 Locked {} records", keys.len());
        LockSet { keys, _guards: guards }
    }

    // `keys` is sorted, so the mutexes come back in lock order.
    fn mutexes_for(&self, keys: &BTreeSet<LockKey>) -> Vec<Arc<AsyncMutex<()>>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Nobody holds or waits on an entry whose only reference is the registry's own
        locks.retain(|_, m| Arc::strong_count(m) > 1);
        keys.iter().map(|k| Arc::clone(locks.entry(k.clone()).or_default())).collect()
    }

    pub fn len(&self) -> usize {
        match self.locks.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
