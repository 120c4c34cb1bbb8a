//! Collection lock registry
//!
//! One write lock per collection, created on first touch and reused forever.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to a collection's write lock
pub type CollectionLock = Arc<Mutex<()>>;

/// Maps collection names to their write locks
///
/// ## Concurrency:
/// - `locks`: guarded by its own Mutex, held only for the lookup/insert
/// - First touch inserts, every later touch reuses the same `Arc`
/// - Entries are never removed (the set of collections is small and bounded)
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, CollectionLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock for a collection, installing it if absent
    pub fn lock_for(&self, collection: &str) -> CollectionLock {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(collection) {
            return Arc::clone(lock);
        }

        tracing::trace!("Creating write lock for collection '{}'", collection);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(collection.to_string(), Arc::clone(&lock));
        lock
    }

    /// Number of collections touched so far
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
