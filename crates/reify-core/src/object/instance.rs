//! Class instances

use parking_lot::RwLock;

use super::monitor::Monitor;
use super::value::Value;
use crate::error::{RuntimeError, RuntimeResult};
use crate::types::TypeRef;

/// Heap instance of a reference class
///
/// Carries its reified type, so an instance created from an instantiation
/// reports that instantiation as its runtime type.
pub struct Instance {
    ty: TypeRef,
    fields: RwLock<Vec<Value>>,
    monitor: Monitor,
}

impl Instance {
    /// Create an instance with `field_count` null fields
    pub fn new(ty: TypeRef, field_count: usize) -> Self {
        Self {
            ty,
            fields: RwLock::new(vec![Value::Null; field_count]),
            monitor: Monitor::new(),
        }
    }

    /// Runtime type
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Get a field value by index
    pub fn field(&self, index: usize) -> Option<Value> {
        self.fields.read().get(index).cloned()
    }

    /// Set a field value by index
    pub fn set_field(&self, index: usize, value: Value) -> RuntimeResult<()> {
        let mut fields = self.fields.write();
        let length = fields.len();
        let slot = fields
            .get_mut(index)
            .ok_or(RuntimeError::IndexOutOfRange { index, length })?;
        *slot = value;
        Ok(())
    }

    /// Get number of fields
    pub fn field_count(&self) -> usize {
        self.fields.read().len()
    }

    /// Instance monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("ty", &self.ty.name())
            .field("fields", &self.field_count())
            .finish()
    }
}
