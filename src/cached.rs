use std::any::Any;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::class::{self, Accessor, ClassRef};
use crate::error::{BoxError, Error, Result};
use crate::slot::{self, Mode, Producer, SlotDescriptor};
use crate::storage::Value;
use crate::Resolver;


/// A class-level analogue of a cached property.
///
/// - The value is cached per owning class, in that class's storage.
/// - The first read computes `producer(cls)` and caches it on `cls`.
/// - `delete` through an instance invalidates the cache for the instance's
///   class; the next read recomputes and recaches it.
/// - `set` through an instance overwrites the cached value for the instance's
///   class.
///
/// Concurrent first reads are not coordinated: each may run the producer, and
/// the last one to store wins. Use `ThreadsafeCachedClassProperty` when the
/// producer must run exactly once.
pub struct CachedClassProperty<T> {
    descriptor: SlotDescriptor,
    producer: Producer<T>,
}


impl<T> Clone for CachedClassProperty<T> {
    fn clone(&self) -> CachedClassProperty<T> {
        CachedClassProperty {
            descriptor: self.descriptor.clone(),
            producer: self.producer.clone(),
        }
    }
}


impl<T: Any + Send + Sync> CachedClassProperty<T> {
    pub fn new<F>(name: &str, f: F) -> CachedClassProperty<T>
        where F: Fn(&ClassRef) -> T + Send + Sync + 'static
    {
        CachedClassProperty::with_mode(name, Mode::Cached, slot::infallible(f))
    }

    /// Like `new`, for a producer that can fail. A failure is never cached.
    pub fn try_new<F, E>(name: &str, f: F) -> CachedClassProperty<T>
        where F: Fn(&ClassRef) -> Result<T, E> + Send + Sync + 'static,
              E: Into<BoxError> + 'static
    {
        CachedClassProperty::with_mode(name, Mode::Cached, slot::fallible(f))
    }

    pub(crate) fn with_mode(name: &str, mode: Mode, producer: Producer<T>) -> CachedClassProperty<T> {
        CachedClassProperty {
            descriptor: SlotDescriptor::new(name, mode),
            producer,
        }
    }

    pub fn with_doc(mut self, doc: &str) -> CachedClassProperty<T> {
        self.descriptor = self.descriptor.with_doc(doc);
        self
    }

    #[inline]
    pub fn descriptor(&self) -> &SlotDescriptor {
        &self.descriptor
    }

    /// Return the value cached on the accessor's owning class, computing and
    /// caching it first if there is none.
    pub fn get<'a, A: Into<Accessor<'a>>>(&self, accessor: A) -> Result<Arc<T>> {
        let owner = accessor.into().owner();

        match self.lookup(owner)? {
            Some(value) => Ok(value),
            None => self.compute(owner),
        }
    }

    /// Overwrite the cached value of the instance's class without running the
    /// producer. Fails if `accessor` is the class object.
    pub fn set<'a, A: Into<Accessor<'a>>>(&self, accessor: A, value: T) -> Result<()> {
        let owner = self.instance_owner(accessor.into(), Error::set_on_class)?;
        self.store(owner, Arc::new(value));
        Ok(())
    }

    /// Invalidate the cached value of the instance's class. A no-op if nothing
    /// is cached. Fails if `accessor` is the class object.
    pub fn delete<'a, A: Into<Accessor<'a>>>(&self, accessor: A) -> Result<()> {
        let owner = self.instance_owner(accessor.into(), Error::delete_on_class)?;
        self.clear(owner);
        Ok(())
    }

    /// Explicitly set the cached value for `owner`.
    pub fn set_for(&self, owner: &ClassRef, value: T) {
        self.store(owner, Arc::new(value));
    }

    /// Explicitly invalidate the cached value for `owner`.
    pub fn invalidate(&self, owner: &ClassRef) {
        self.clear(owner);
    }

    /// Whether `owner` currently holds a cached value for this slot.
    pub fn is_cached(&self, owner: &ClassRef) -> bool {
        owner.storage().contains(self.descriptor.name())
    }

    /// The value cached on `owner` itself. Bases are never consulted.
    pub(crate) fn lookup(&self, owner: &ClassRef) -> Result<Option<Arc<T>>> {
        let name = self.descriptor.name();

        match owner.storage().get(name) {
            Some(value) => {
                trace!(slot = name, class = owner.name(), "cache hit");
                class::downcast(name, value).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Run the producer and cache its result on `owner`. Nothing is stored if
    /// the producer fails.
    pub(crate) fn compute(&self, owner: &ClassRef) -> Result<Arc<T>> {
        let value = Arc::new(slot::produce(&self.descriptor, &self.producer, owner)?);
        self.store(owner, value.clone());
        Ok(value)
    }

    pub(crate) fn store(&self, owner: &ClassRef, value: Arc<T>) {
        debug!(slot = self.descriptor.name(),
               class = owner.name(),
               mode = %self.descriptor.mode(),
               "storing value");

        owner.storage().insert(self.descriptor.name(), value);
    }

    pub(crate) fn clear(&self, owner: &ClassRef) {
        if owner.storage().remove(self.descriptor.name()).is_some() {
            debug!(slot = self.descriptor.name(),
                   class = owner.name(),
                   mode = %self.descriptor.mode(),
                   "invalidated value");
        }
    }

    /// The owning class of an instance accessor. A class accessor is rejected
    /// with the error `reject` builds.
    pub(crate) fn instance_owner<'a>(&self,
                                     accessor: Accessor<'a>,
                                     reject: fn(&str) -> Error)
                                     -> Result<&'a ClassRef> {
        match accessor {
            Accessor::Instance(instance) => Ok(instance.class()),
            Accessor::Class(_) => Err(reject(self.descriptor.name())),
        }
    }
}


impl<T: Any + Send + Sync> Resolver for CachedClassProperty<T> {
    fn descriptor(&self) -> &SlotDescriptor {
        &self.descriptor
    }

    fn get_dyn(&self, accessor: Accessor) -> Result<Value> {
        let value: Value = self.get(accessor)?;
        Ok(value)
    }

    fn set_dyn(&self, accessor: Accessor, value: Value) -> Result<()> {
        let owner = self.instance_owner(accessor, Error::set_on_class)?;
        let value = class::downcast::<T>(self.descriptor.name(), value)?;
        self.store(owner, value);
        Ok(())
    }

    fn delete_dyn(&self, accessor: Accessor) -> Result<()> {
        self.delete(accessor)
    }
}
