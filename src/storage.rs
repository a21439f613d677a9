use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};


/// A type-erased attribute or cached value. Handing out clones of the `Arc`
/// keeps the identity of a cached value observable.
pub type Value = Arc<dyn Any + Send + Sync>;


/// Class-level storage for cached slots, owned by one `Class`.
///
/// `values` holds at most one entry per slot name. Every read and write of it
/// goes through the `RwLock`, so a value stored under a slot lock is visible to
/// readers that never take that slot lock.
///
/// `locks` is the lock registry of the thread-safe mode: one reentrant mutex
/// per slot, created on first use and dropped with the class.
#[derive(Default)]
pub(crate) struct ClassStorage {
    values: RwLock<HashMap<Arc<str>, Value>>,
    locks: Mutex<HashMap<Arc<str>, Arc<ReentrantMutex<()>>>>,
}


impl ClassStorage {
    #[inline]
    pub(crate) fn get(&self, slot: &str) -> Option<Value> {
        self.values.read().get(slot).cloned()
    }

    #[inline]
    pub(crate) fn contains(&self, slot: &str) -> bool {
        self.values.read().contains_key(slot)
    }

    /// Store `value` under `slot`, returning the entry it replaced.
    pub(crate) fn insert(&self, slot: &str, value: Value) -> Option<Value> {
        self.values.write().insert(slot.into(), value)
    }

    pub(crate) fn remove(&self, slot: &str) -> Option<Value> {
        self.values.write().remove(slot)
    }

    /// The slot's lock on this class, created if this is its first use.
    pub(crate) fn lock_for(&self, slot: &str) -> Arc<ReentrantMutex<()>> {
        let mut locks = self.locks.lock();

        if let Some(lock) = locks.get(slot) {
            return lock.clone();
        }

        let lock = Arc::new(ReentrantMutex::new(()));
        locks.insert(slot.into(), lock.clone());
        lock
    }

    /// Names of the slots that currently hold a value, sorted.
    pub(crate) fn cached_slots(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.values.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }
}


impl fmt::Debug for ClassStorage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClassStorage")
            .field("cached", &self.cached_slots())
            .field("locks", &self.locks.lock().len())
            .finish()
    }
}
