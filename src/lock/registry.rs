//! Lock registry implementation
//!
//! HashMap of per-key RwLocks behind a parking_lot Mutex.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::LockRetention;

type SharedLock = Arc<RwLock<()>>;

/// Registry of per-key locks owned by a single store
///
/// ## Concurrency:
/// - `locks`: guarded by one Mutex, held only for lookup-or-insert
///   and eviction checks
/// - Per-key locks are `RwLock<()>`: writers take them exclusively,
///   readers in `Shared` mode take them shared
/// - Every `Arc` clone of a per-key lock is made under the guard, so
///   the strong count observed under the guard is exact
pub struct LockRegistry {
    locks: Mutex<HashMap<String, SharedLock>>,
    retention: LockRetention,
}

impl LockRegistry {
    /// Create an empty registry
    pub fn new(retention: LockRetention) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Get the lock for `key`, creating it on first use
    ///
    /// The returned handle is not yet held; call `write()` or `read()`.
    /// While any handle for `key` is alive, every other `acquire(key)`
    /// returns a handle to the same lock object.
    pub fn acquire(&self, key: &str) -> KeyLock<'_> {
        let mut locks = self.locks.lock();

        let lock = match locks.get(key) {
            Some(existing) => Arc::clone(existing),
            None => {
                let created = Arc::new(RwLock::new(()));
                locks.insert(key.to_string(), Arc::clone(&created));
                created
            }
        };

        KeyLock {
            registry: self,
            key: key.to_string(),
            lock: Some(lock),
        }
    }

    /// Number of keys that currently have a lock object
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// True if no key has a lock object
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    /// The retention mode this registry was built with
    pub fn retention(&self) -> LockRetention {
        self.retention
    }

    /// Called when a handle is dropped
    fn release(&self, key: &str, lock: SharedLock) {
        if self.retention != LockRetention::EvictIdle {
            return;
        }

        let mut locks = self.locks.lock();

        // Map entry + this handle means no other holder or waiter. The
        // handle's reference is dropped under the guard so concurrent
        // releases observe each other's decrements.
        let idle = locks
            .get(key)
            .map(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) == 2)
            .unwrap_or(false);
        drop(lock);

        if idle {
            locks.remove(key);
            tracing::trace!(key, "evicted idle key lock");
        }
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new(LockRetention::Retain)
    }
}

/// Handle to one key's lock, obtained from [`LockRegistry::acquire`]
///
/// Guards borrow from the handle, so they are always released before
/// the handle itself is dropped.
pub struct KeyLock<'a> {
    registry: &'a LockRegistry,
    key: String,
    lock: Option<SharedLock>,
}

impl KeyLock<'_> {
    /// Block until the key is held exclusively
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.shared().write()
    }

    /// Block until the key is held shared
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.shared().read()
    }

    /// The key this handle locks
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True if both handles refer to the same lock object
    pub fn same_lock(&self, other: &KeyLock<'_>) -> bool {
        Arc::ptr_eq(self.shared(), other.shared())
    }

    fn shared(&self) -> &SharedLock {
        // Only `Drop` takes the lock out of the handle.
        match &self.lock {
            Some(lock) => lock,
            None => unreachable!("key lock used after release"),
        }
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            self.registry.release(&self.key, lock);
        }
    }
}
