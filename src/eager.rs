use std::any::Any;
use std::sync::Arc;

use crate::class::{Accessor, ClassRef};
use crate::error::{BoxError, Error, Result};
use crate::slot::{self, Mode, Producer, SlotDescriptor};
use crate::storage::Value;
use crate::Resolver;


/// A read-only, class-level analogue of a computed property. Every read runs
/// the producer against the owning class; nothing is stored.
pub struct ClassProperty<T> {
    descriptor: SlotDescriptor,
    producer: Producer<T>,
}


impl<T> Clone for ClassProperty<T> {
    fn clone(&self) -> ClassProperty<T> {
        ClassProperty {
            descriptor: self.descriptor.clone(),
            producer: self.producer.clone(),
        }
    }
}


impl<T: Any + Send + Sync> ClassProperty<T> {
    pub fn new<F>(name: &str, f: F) -> ClassProperty<T>
        where F: Fn(&ClassRef) -> T + Send + Sync + 'static
    {
        ClassProperty {
            descriptor: SlotDescriptor::new(name, Mode::Eager),
            producer: slot::infallible(f),
        }
    }

    /// Like `new`, for a producer that can fail.
    pub fn try_new<F, E>(name: &str, f: F) -> ClassProperty<T>
        where F: Fn(&ClassRef) -> Result<T, E> + Send + Sync + 'static,
              E: Into<BoxError> + 'static
    {
        ClassProperty {
            descriptor: SlotDescriptor::new(name, Mode::Eager),
            producer: slot::fallible(f),
        }
    }

    pub fn with_doc(mut self, doc: &str) -> ClassProperty<T> {
        self.descriptor = self.descriptor.with_doc(doc);
        self
    }

    #[inline]
    pub fn descriptor(&self) -> &SlotDescriptor {
        &self.descriptor
    }

    /// Compute a fresh value for the accessor's owning class.
    pub fn get<'a, A: Into<Accessor<'a>>>(&self, accessor: A) -> Result<Arc<T>> {
        let owner = accessor.into().owner();
        slot::produce(&self.descriptor, &self.producer, owner).map(Arc::new)
    }

    /// Always fails: there is no storage to write to.
    pub fn set<'a, A: Into<Accessor<'a>>>(&self, _accessor: A, _value: T) -> Result<()> {
        Err(Error::read_only(self.descriptor.name()))
    }

    /// Always fails: there is no storage to clear.
    pub fn delete<'a, A: Into<Accessor<'a>>>(&self, _accessor: A) -> Result<()> {
        Err(Error::read_only(self.descriptor.name()))
    }
}


impl<T: Any + Send + Sync> Resolver for ClassProperty<T> {
    fn descriptor(&self) -> &SlotDescriptor {
        &self.descriptor
    }

    fn get_dyn(&self, accessor: Accessor) -> Result<Value> {
        let value: Value = self.get(accessor)?;
        Ok(value)
    }

    fn set_dyn(&self, _accessor: Accessor, _value: Value) -> Result<()> {
        Err(Error::read_only(self.descriptor.name()))
    }

    fn delete_dyn(&self, _accessor: Accessor) -> Result<()> {
        Err(Error::read_only(self.descriptor.name()))
    }
}
