//! Type-erased configuration payloads.
//!
//! Network and entity configs are opaque to the graph model: their concrete
//! types are owned by whichever module registered a serde for them. A
//! [`ConfigValue`] carries such a payload behind a shared pointer and can be
//! downcast back to the concrete type by code that knows it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Capability required from any concrete config type.
///
/// Blanket-implemented for every `'static` type that is `Debug`,
/// `PartialEq`, `Send` and `Sync`.
pub trait ConfigPayload: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_payload(&self, other: &dyn ConfigPayload) -> bool;
}

impl<T> ConfigPayload for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_payload(&self, other: &dyn ConfigPayload) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }
}

/// A deserialized, type-erased config value.
#[derive(Clone)]
pub struct ConfigValue(Arc<dyn ConfigPayload>);

impl ConfigValue {
    pub fn new<T: ConfigPayload>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// Access the erased payload.
    pub fn payload(&self) -> &dyn ConfigPayload {
        self.0.as_ref()
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_payload(other.0.as_ref())
    }
}
