use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::class::ClassRef;
use crate::error::{BoxError, Error, Result};


/// How a slot treats the values its producer computes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Recompute on every access; never store.
    Eager,

    /// Compute once per class and serve from class-level storage thereafter.
    Cached,

    /// As `Cached`, with the first computation serialized behind a per-class,
    /// per-slot lock so the producer runs exactly once under contention.
    CachedLocked,
}


impl Mode {
    /// Whether the mode keeps values in class-level storage.
    #[inline]
    pub fn is_cached(self) -> bool {
        self != Mode::Eager
    }
}


impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Mode::Eager => "eager",
            Mode::Cached => "cached",
            Mode::CachedLocked => "cached-locked",
        })
    }
}


/// The fixed identity of one named computed attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDescriptor {
    name: Arc<str>,
    mode: Mode,
    doc: Option<Arc<str>>,
}


impl SlotDescriptor {
    pub(crate) fn new(name: &str, mode: Mode) -> SlotDescriptor {
        SlotDescriptor {
            name: name.into(),
            mode,
            doc: None,
        }
    }

    pub(crate) fn with_doc(mut self, doc: &str) -> SlotDescriptor {
        self.doc = Some(doc.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}


/// A producer with its error type erased. Shared by every class that
/// resolves the slot.
pub(crate) type Producer<T> = Arc<dyn Fn(&ClassRef) -> Result<T, BoxError> + Send + Sync>;


pub(crate) fn infallible<T, F>(f: F) -> Producer<T>
    where T: 'static,
          F: Fn(&ClassRef) -> T + Send + Sync + 'static
{
    Arc::new(move |cls: &ClassRef| -> Result<T, BoxError> { Ok(f(cls)) })
}


pub(crate) fn fallible<T, E, F>(f: F) -> Producer<T>
    where T: 'static,
          F: Fn(&ClassRef) -> Result<T, E> + Send + Sync + 'static,
          E: Into<BoxError> + 'static
{
    Arc::new(move |cls: &ClassRef| -> Result<T, BoxError> { f(cls).map_err(Into::into) })
}


/// Run `producer` against `owner`, wrapping a failure in `Error::Producer`.
pub(crate) fn produce<T>(descriptor: &SlotDescriptor,
                         producer: &Producer<T>,
                         owner: &ClassRef)
                         -> Result<T> {
    debug!(slot = descriptor.name(),
           class = owner.name(),
           mode = %descriptor.mode(),
           "running producer");

    producer(owner).map_err(|source| {
        debug!(slot = descriptor.name(),
               class = owner.name(),
               error = %source,
               "producer failed");

        Error::Producer {
            slot: descriptor.name().to_owned(),
            class: owner.name().to_owned(),
            source,
        }
    })
}
