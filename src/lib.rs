//! This crate provides class-scoped computed attributes: values derived from a
//! class rather than an instance, readable uniformly through the class object
//! or any of its instances.
//!
//! Three property types are provided, all implementing `Resolver`:
//! * `ClassProperty`: an eager, read-only property which runs its producer
//!   on every access.
//! * `CachedClassProperty`: computes once per class and serves the stored
//!   value until it is overwritten or invalidated through an instance. Not
//!   safe against concurrent first access: racing readers may each compute.
//! * `ThreadsafeCachedClassProperty`: as `CachedClassProperty`, but the first
//!   computation runs under a per-class, per-slot reentrant lock, so the
//!   producer runs exactly once however many threads race on an empty slot.
//!
//! Values are cached per class. A subclass that inherits a cached slot
//! resolves it against its own class, so sibling subclasses never share a
//! cached value.
//!
//! ```
//! use classprop::{CachedClassProperty, Class};
//!
//! let boot_time = CachedClassProperty::new("boot_time", |cls| format!("{} booted", cls.name()));
//! let app = Class::builder("App").slot(boot_time.clone()).build().unwrap();
//!
//! let from_class = boot_time.get(&app).unwrap();
//! let from_instance = boot_time.get(&app.instantiate()).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&from_class, &from_instance));
//! ```

pub mod cached;
pub mod class;
pub mod eager;
pub mod error;
pub mod slot;
pub mod threadsafe;

mod storage;


pub use cached::CachedClassProperty;
pub use class::{Accessor, Ancestry, Class, ClassBuilder, ClassRef, Instance};
pub use eager::ClassProperty;
pub use error::{BoxError, Error, Result};
pub use slot::{Mode, SlotDescriptor};
pub use storage::Value;
pub use threadsafe::ThreadsafeCachedClassProperty;


/// The `Resolver` trait is the type-erased face of a slot, through which a
/// class dispatches reads, writes and deletes of heterogeneous slots.
///
/// Writes and deletes issued through `Accessor::Class` are always rejected
/// with `Error::UnsupportedMutation`, whatever the mode.
pub trait Resolver: Send + Sync {
    /// The slot's fixed name and mode.
    fn descriptor(&self) -> &SlotDescriptor;

    /// Resolve the slot's value for the accessor's owning class.
    fn get_dyn(&self, accessor: Accessor) -> Result<Value>;

    /// Overwrite the cached value. Fails with `Error::TypeMismatch` if `value`
    /// is not of the slot's type.
    fn set_dyn(&self, accessor: Accessor, value: Value) -> Result<()>;

    /// Invalidate the cached value. Deleting an empty slot is not an error.
    fn delete_dyn(&self, accessor: Accessor) -> Result<()>;
}
