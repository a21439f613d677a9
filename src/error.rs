use thiserror::Error;


/// The error type a producer may fail with. Producers return any error that
/// converts into this, and it reaches the caller of `get` untouched as the
/// `source` of `Error::Producer`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;


pub type Result<T, E = Error> = std::result::Result<T, E>;


#[derive(Debug, Error)]
pub enum Error {
    /// A write or delete that the slot cannot honor: every write/delete on an
    /// eager slot, and any write/delete issued through the class object itself.
    #[error("cannot mutate class property '{slot}': {reason}")]
    UnsupportedMutation { slot: String, reason: &'static str },

    /// The producer of `slot` failed while computing for `class`. Nothing was
    /// stored.
    #[error("producer for class property '{slot}' on class '{class}' failed")]
    Producer {
        slot: String,
        class: String,
        #[source]
        source: BoxError,
    },

    #[error("class '{class}' has no attribute '{name}'")]
    AttributeNotFound { class: String, name: String },

    #[error("attribute '{name}' does not hold a value of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("class '{class}' declares slot '{slot}' more than once")]
    DuplicateSlot { class: String, slot: String },
}


impl Error {
    pub(crate) fn read_only(slot: &str) -> Self {
        Error::UnsupportedMutation {
            slot: slot.to_owned(),
            reason: "class property is read-only",
        }
    }

    pub(crate) fn set_on_class(slot: &str) -> Self {
        Error::UnsupportedMutation {
            slot: slot.to_owned(),
            reason: "cannot be set on the class; set it via an instance or `set_for` instead",
        }
    }

    pub(crate) fn delete_on_class(slot: &str) -> Self {
        Error::UnsupportedMutation {
            slot: slot.to_owned(),
            reason: "cannot be deleted on the class; delete it via an instance or `invalidate` instead",
        }
    }

    pub(crate) fn type_mismatch<T>(name: &str) -> Self {
        Error::TypeMismatch {
            name: name.to_owned(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// `true` for `UnsupportedMutation`.
    pub fn is_unsupported_mutation(&self) -> bool {
        matches!(self, Error::UnsupportedMutation { .. })
    }

    /// The producer's own error, if this is a producer failure.
    pub fn producer_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Producer { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
