use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::cached::CachedClassProperty;
use crate::class::{self, Accessor, ClassRef};
use crate::error::{BoxError, Error, Result};
use crate::slot::{self, Mode, SlotDescriptor};
use crate::storage::Value;
use crate::Resolver;


/// A thread-safe `CachedClassProperty`.
///
/// Reads, writes and deletes of the slot on a given class are serialized by
/// that class's reentrant lock for the slot, so concurrent first reads run the
/// producer exactly once and all observe the same `Arc`. A read that finds the
/// value already cached never touches the lock.
///
/// The lock is reentrant: a producer may read, set or invalidate its own slot
/// on the same thread without deadlocking. A producer that blocks forever
/// stalls every other reader of the slot on that class.
pub struct ThreadsafeCachedClassProperty<T> {
    inner: CachedClassProperty<T>,
}


impl<T> Clone for ThreadsafeCachedClassProperty<T> {
    fn clone(&self) -> ThreadsafeCachedClassProperty<T> {
        ThreadsafeCachedClassProperty { inner: self.inner.clone() }
    }
}


impl<T: Any + Send + Sync> ThreadsafeCachedClassProperty<T> {
    pub fn new<F>(name: &str, f: F) -> ThreadsafeCachedClassProperty<T>
        where F: Fn(&ClassRef) -> T + Send + Sync + 'static
    {
        ThreadsafeCachedClassProperty {
            inner: CachedClassProperty::with_mode(name, Mode::CachedLocked, slot::infallible(f)),
        }
    }

    /// Like `new`, for a producer that can fail. A failure releases the lock
    /// and leaves the slot empty, so the next read retries.
    pub fn try_new<F, E>(name: &str, f: F) -> ThreadsafeCachedClassProperty<T>
        where F: Fn(&ClassRef) -> Result<T, E> + Send + Sync + 'static,
              E: Into<BoxError> + 'static
    {
        ThreadsafeCachedClassProperty {
            inner: CachedClassProperty::with_mode(name, Mode::CachedLocked, slot::fallible(f)),
        }
    }

    pub fn with_doc(self, doc: &str) -> ThreadsafeCachedClassProperty<T> {
        ThreadsafeCachedClassProperty { inner: self.inner.with_doc(doc) }
    }

    #[inline]
    pub fn descriptor(&self) -> &SlotDescriptor {
        self.inner.descriptor()
    }

    pub fn get<'a, A: Into<Accessor<'a>>>(&self, accessor: A) -> Result<Arc<T>> {
        let owner = accessor.into().owner();

        if let Some(value) = self.inner.lookup(owner)? {
            return Ok(value);
        }

        let lock = owner.storage().lock_for(self.name());
        let _guard = lock.lock();

        // Another reader may have filled the slot while we waited.
        if let Some(value) = self.inner.lookup(owner)? {
            trace!(slot = self.name(), class = owner.name(), "filled while waiting for lock");
            return Ok(value);
        }

        self.inner.compute(owner)
    }

    pub fn set<'a, A: Into<Accessor<'a>>>(&self, accessor: A, value: T) -> Result<()> {
        let owner = self.inner.instance_owner(accessor.into(), Error::set_on_class)?;
        self.set_for(owner, value);
        Ok(())
    }

    pub fn delete<'a, A: Into<Accessor<'a>>>(&self, accessor: A) -> Result<()> {
        let owner = self.inner.instance_owner(accessor.into(), Error::delete_on_class)?;
        self.invalidate(owner);
        Ok(())
    }

    pub fn set_for(&self, owner: &ClassRef, value: T) {
        self.store_locked(owner, Arc::new(value));
    }

    pub fn invalidate(&self, owner: &ClassRef) {
        let lock = owner.storage().lock_for(self.name());
        let _guard = lock.lock();
        self.inner.clear(owner);
    }

    #[inline]
    pub fn is_cached(&self, owner: &ClassRef) -> bool {
        self.inner.is_cached(owner)
    }

    fn store_locked(&self, owner: &ClassRef, value: Arc<T>) {
        let lock = owner.storage().lock_for(self.name());
        let _guard = lock.lock();
        self.inner.store(owner, value);
    }

    #[inline]
    fn name(&self) -> &str {
        self.inner.descriptor().name()
    }
}


impl<T: Any + Send + Sync> Resolver for ThreadsafeCachedClassProperty<T> {
    fn descriptor(&self) -> &SlotDescriptor {
        self.inner.descriptor()
    }

    fn get_dyn(&self, accessor: Accessor) -> Result<Value> {
        let value: Value = self.get(accessor)?;
        Ok(value)
    }

    fn set_dyn(&self, accessor: Accessor, value: Value) -> Result<()> {
        let owner = self.inner.instance_owner(accessor, Error::set_on_class)?;
        let value = class::downcast::<T>(self.name(), value)?;
        self.store_locked(owner, value);
        Ok(())
    }

    fn delete_dyn(&self, accessor: Accessor) -> Result<()> {
        self.delete(accessor)
    }
}
