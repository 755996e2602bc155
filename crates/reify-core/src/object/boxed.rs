//! Boxed values

use super::monitor::Monitor;
use super::value::Value;
use crate::types::TypeRef;

/// Heap box around a primitive or struct value
pub struct BoxedValue {
    ty: TypeRef,
    value: Value,
    monitor: Monitor,
}

impl BoxedValue {
    pub(crate) fn new(ty: TypeRef, value: Value) -> Self {
        Self {
            ty,
            value,
            monitor: Monitor::new(),
        }
    }

    /// Exact value type of the payload
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Copy of the payload
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Box monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

impl std::fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedValue")
            .field("ty", &self.ty.name())
            .field("value", &self.value)
            .finish()
    }
}
