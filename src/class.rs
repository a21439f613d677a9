//! A minimal runtime object model: classes with single inheritance, plain
//! class and instance attributes, and named slots resolved through a
//! `Resolver`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::storage::{ClassStorage, Value};
use crate::Resolver;


/// Shared handle to a class. Class identity is pointer identity.
pub type ClassRef = Arc<Class>;


/// A class object: a name, an optional base, a namespace of plain attributes,
/// the slots declared in its body, and class-level storage for cached slots.
pub struct Class {
    name: String,
    base: Option<ClassRef>,

    /// Plain class attributes. Interior mutability lets a producer change
    /// class state while it runs.
    attrs: RwLock<HashMap<String, Value>>,

    /// Slots declared in this class body. Fixed once the class is built.
    slots: HashMap<Arc<str>, Arc<dyn Resolver>>,

    storage: ClassStorage,
}


impl Class {
    /// Start declaring a class body.
    pub fn builder<S: Into<String>>(name: S) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            base: None,
            attrs: HashMap::new(),
            slots: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn base(&self) -> Option<&ClassRef> {
        self.base.as_ref()
    }

    #[inline]
    pub(crate) fn storage(&self) -> &ClassStorage {
        &self.storage
    }

    /// `true` if both handles name the same class object.
    #[inline]
    pub fn same_class(a: &ClassRef, b: &ClassRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// This class followed by its bases, nearest first.
    pub fn ancestry(&self) -> Ancestry<'_> {
        Ancestry { next: Some(self) }
    }

    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ancestry().any(|cls| std::ptr::eq(cls, other))
    }

    /// Find the slot `name` in this class or the nearest base declaring it.
    pub fn find_slot(&self, name: &str) -> Option<&Arc<dyn Resolver>> {
        self.ancestry().find_map(|cls| cls.slots.get(name))
    }

    /// Names of the slots declared in this class body, sorted.
    pub fn declared_slots(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(|name| &**name).collect();
        names.sort();
        names
    }

    /// Names of the slots holding a cached value on this class, sorted.
    pub fn cached_slots(&self) -> Vec<String> {
        self.storage.cached_slots().iter().map(|name| name.to_string()).collect()
    }

    /// Look up a plain class attribute along the base chain. Slots are not
    /// consulted.
    pub fn attr(&self, name: &str) -> Option<Value> {
        self.ancestry().find_map(|cls| cls.attrs.read().get(name).cloned())
    }

    pub fn attr_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.attr(name).ok_or_else(|| self.not_found(name))?;
        downcast(name, value)
    }

    /// Create an instance of this class.
    pub fn instantiate(self: &Arc<Self>) -> Instance {
        Instance::new(self)
    }

    /// `Class.name`: a slot resolved against this class, else a plain class
    /// attribute.
    pub fn getattr(self: &Arc<Self>, name: &str) -> Result<Value> {
        match self.find_slot(name) {
            Some(slot) => slot.get_dyn(Accessor::Class(self)),
            None => self.attr(name).ok_or_else(|| self.not_found(name)),
        }
    }

    pub fn getattr_as<T: Any + Send + Sync>(self: &Arc<Self>, name: &str) -> Result<Arc<T>> {
        downcast(name, self.getattr(name)?)
    }

    /// `Class.name = value`. Rejected for slot names, since replacing the slot
    /// would break resolution for every instance and subclass.
    pub fn setattr<T: Any + Send + Sync>(self: &Arc<Self>, name: &str, value: T) -> Result<()> {
        if let Some(slot) = self.find_slot(name) {
            return slot.set_dyn(Accessor::Class(self), Arc::new(value));
        }

        self.attrs.write().insert(name.to_owned(), Arc::new(value));
        Ok(())
    }

    /// `del Class.name`. Rejected for slot names; otherwise removes an
    /// attribute of this class (not of a base).
    pub fn delattr(self: &Arc<Self>, name: &str) -> Result<()> {
        if let Some(slot) = self.find_slot(name) {
            return slot.delete_dyn(Accessor::Class(self));
        }

        match self.attrs.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(self.not_found(name)),
        }
    }

    fn not_found(&self, name: &str) -> Error {
        Error::AttributeNotFound {
            class: self.name.clone(),
            name: name.to_owned(),
        }
    }
}


impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut attrs: Vec<String> = self.attrs.read().keys().cloned().collect();
        attrs.sort();

        f.debug_struct("Class")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|base| base.name()))
            .field("attrs", &attrs)
            .field("slots", &self.declared_slots())
            .field("storage", &self.storage)
            .finish()
    }
}


/// Iterator over a class and its bases.
pub struct Ancestry<'a> {
    next: Option<&'a Class>,
}


impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<&'a Class> {
        let current = self.next?;
        self.next = current.base.as_deref();
        Some(current)
    }
}


/// Declares a class body. Adding a slot attaches its descriptor to the class
/// under the descriptor's name.
pub struct ClassBuilder {
    name: String,
    base: Option<ClassRef>,
    attrs: HashMap<String, Value>,
    slots: Vec<Arc<dyn Resolver>>,
}


impl ClassBuilder {
    pub fn base(mut self, base: &ClassRef) -> ClassBuilder {
        self.base = Some(base.clone());
        self
    }

    pub fn attr<T: Any + Send + Sync>(mut self, name: &str, value: T) -> ClassBuilder {
        self.attrs.insert(name.to_owned(), Arc::new(value));
        self
    }

    pub fn slot<R: Resolver + 'static>(mut self, slot: R) -> ClassBuilder {
        self.slots.push(Arc::new(slot));
        self
    }

    /// Finish the class. Fails if the body declares a slot name twice.
    pub fn build(self) -> Result<ClassRef> {
        let mut slots: HashMap<Arc<str>, Arc<dyn Resolver>> = HashMap::new();

        for slot in self.slots {
            let name: Arc<str> = slot.descriptor().name().into();

            if slots.contains_key(&name) {
                return Err(Error::DuplicateSlot {
                    class: self.name,
                    slot: name.to_string(),
                });
            }

            slots.insert(name, slot);
        }

        Ok(Arc::new(Class {
            name: self.name,
            base: self.base,
            attrs: RwLock::new(self.attrs),
            slots,
            storage: ClassStorage::default(),
        }))
    }
}


/// An object of some class, with its own attribute namespace.
pub struct Instance {
    class: ClassRef,
    attrs: RwLock<HashMap<String, Value>>,
}


impl Instance {
    pub fn new(class: &ClassRef) -> Instance {
        Instance {
            class: class.clone(),
            attrs: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// `instance.name`: slots first, then the instance namespace, then class
    /// attributes.
    pub fn getattr(&self, name: &str) -> Result<Value> {
        if let Some(slot) = self.class.find_slot(name) {
            return slot.get_dyn(Accessor::Instance(self));
        }

        if let Some(value) = self.attrs.read().get(name) {
            return Ok(value.clone());
        }

        self.class.attr(name).ok_or_else(|| self.class.not_found(name))
    }

    pub fn getattr_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        downcast(name, self.getattr(name)?)
    }

    /// `instance.name = value`. For a cached slot this overwrites the value
    /// cached on the instance's class.
    pub fn setattr<T: Any + Send + Sync>(&self, name: &str, value: T) -> Result<()> {
        if let Some(slot) = self.class.find_slot(name) {
            return slot.set_dyn(Accessor::Instance(self), Arc::new(value));
        }

        self.attrs.write().insert(name.to_owned(), Arc::new(value));
        Ok(())
    }

    /// `del instance.name`. For a cached slot this invalidates the value cached
    /// on the instance's class.
    pub fn delattr(&self, name: &str) -> Result<()> {
        if let Some(slot) = self.class.find_slot(name) {
            return slot.delete_dyn(Accessor::Instance(self));
        }

        match self.attrs.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(self.class.not_found(name)),
        }
    }
}


impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .finish()
    }
}


/// The object an attribute access goes through: the class object itself or
/// one of its instances.
#[derive(Clone, Copy, Debug)]
pub enum Accessor<'a> {
    Class(&'a ClassRef),
    Instance(&'a Instance),
}


impl<'a> Accessor<'a> {
    /// The class whose storage and locks this access is keyed by.
    #[inline]
    pub fn owner(&self) -> &'a ClassRef {
        match *self {
            Accessor::Class(cls) => cls,
            Accessor::Instance(instance) => instance.class(),
        }
    }

    #[inline]
    pub fn is_instance(&self) -> bool {
        matches!(*self, Accessor::Instance(_))
    }
}


impl<'a> From<&'a ClassRef> for Accessor<'a> {
    #[inline]
    fn from(cls: &'a ClassRef) -> Accessor<'a> {
        Accessor::Class(cls)
    }
}


impl<'a> From<&'a Instance> for Accessor<'a> {
    #[inline]
    fn from(instance: &'a Instance) -> Accessor<'a> {
        Accessor::Instance(instance)
    }
}


pub(crate) fn downcast<T: Any + Send + Sync>(name: &str, value: Value) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| Error::type_mismatch::<T>(name))
}
