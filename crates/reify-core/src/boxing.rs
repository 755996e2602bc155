//! Uniform element access
//!
//! [`load`], [`store`] and [`box_reference`] read and write slots of
//! primitive arrays, value-type arrays, reference arrays, instances, strings
//! and proxies through one path. Stores are checked before anything is
//! written, so a rejected store leaves the container unchanged.

use std::sync::Arc;

use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{ElementRef, HostArray, ObjectRef, Primitive, StructValue, Value};
use crate::runtime::TypeSystem;

/// Read the slot at `index`
pub fn load(system: &TypeSystem, container: &ObjectRef, index: usize) -> RuntimeResult<Value> {
    match container {
        ObjectRef::Array(array) => load_array(array, index),
        ObjectRef::Instance(instance) => instance.field(index).ok_or(RuntimeError::IndexOutOfRange {
            index,
            length: instance.field_count(),
        }),
        ObjectRef::String(s) => s
            .char_at(index)
            .map(|c| Value::Primitive(Primitive::Char(c)))
            .ok_or(RuntimeError::IndexOutOfRange {
                index,
                length: s.len(),
            }),
        ObjectRef::Proxy(proxy) => proxy.get(index),
        ObjectRef::Boxed(boxed) => match boxed.value() {
            Value::Struct(s) => s.field(index).cloned().ok_or(RuntimeError::IndexOutOfRange {
                index,
                length: s.fields().len(),
            }),
            _ => Err(not_indexable(system, container)),
        },
        ObjectRef::Reference(_) => Err(not_indexable(system, container)),
    }
}

/// Overwrite the slot at `index`
pub fn store(system: &TypeSystem, container: &ObjectRef, index: usize, value: Value) -> RuntimeResult<()> {
    match container {
        ObjectRef::Array(array) => store_array(system, array, index, value),
        ObjectRef::Instance(instance) => {
            let value = unwrap_reference(system, value)?;
            instance.set_field(index, value)
        }
        ObjectRef::Proxy(proxy) => proxy.set(system, index, value),
        ObjectRef::String(_) => Err(RuntimeError::InvalidOperation(
            "strings are immutable".to_string(),
        )),
        ObjectRef::Boxed(_) | ObjectRef::Reference(_) => Err(not_indexable(system, container)),
    }
}

/// Addressable box over the slot at `index`
pub fn box_reference(
    system: &TypeSystem,
    container: &ObjectRef,
    index: usize,
) -> RuntimeResult<Arc<ElementRef>> {
    let length = match container {
        ObjectRef::Array(array) => array.len(),
        ObjectRef::Instance(instance) => instance.field_count(),
        ObjectRef::Proxy(proxy) => proxy.len(),
        ObjectRef::String(s) => s.len(),
        ObjectRef::Boxed(_) | ObjectRef::Reference(_) => {
            return Err(not_indexable(system, container))
        }
    };
    if index >= length {
        return Err(RuntimeError::IndexOutOfRange { index, length });
    }
    Ok(Arc::new(ElementRef::new(container.clone(), index)))
}

pub(crate) fn load_array(array: &HostArray, index: usize) -> RuntimeResult<Value> {
    array.get(index).ok_or(RuntimeError::IndexOutOfRange {
        index,
        length: array.len(),
    })
}

pub(crate) fn store_array(
    system: &TypeSystem,
    array: &HostArray,
    index: usize,
    value: Value,
) -> RuntimeResult<()> {
    let length = array.len();
    if index >= length {
        return Err(RuntimeError::IndexOutOfRange { index, length });
    }
    let element = array.element_type().ok_or_else(|| {
        RuntimeError::InvalidOperation(format!("{} is not an array type", array.ty().name()))
    })?;

    // Resolve the incoming value before the storage lock is taken; it may
    // refer back into this very array.
    let value = unwrap_reference(system, value)?;
    let mismatch = |value: &Value| RuntimeError::ArrayTypeMismatch {
        expected: element.name().to_string(),
        actual: value_type_name(system, value),
    };

    let written = if let Some(kind) = element.primitive_kind() {
        let primitive = match &value {
            Value::Primitive(p) => Some(*p),
            Value::Object(ObjectRef::Boxed(b)) => b.value().as_primitive(),
            _ => None,
        }
        .filter(|p| p.kind() == kind)
        .ok_or_else(|| mismatch(&value))?;
        array.storage_mut().write_primitive(index, primitive)
    } else if element.is_value_type() {
        let item: StructValue = match &value {
            Value::Struct(s) => Some(s.clone()),
            Value::Object(ObjectRef::Boxed(b)) => b.value().as_struct().cloned(),
            _ => None,
        }
        .filter(|s| Arc::ptr_eq(s.ty(), element))
        .ok_or_else(|| mismatch(&value))?;
        array.storage_mut().write_struct(index, item)
    } else {
        let item = match system.box_value(value)? {
            Value::Null => None,
            Value::Object(obj) => {
                let source = system.object_type_of(&obj)?;
                if !system.is_assignable(element, &source) {
                    return Err(RuntimeError::ArrayTypeMismatch {
                        expected: element.name().to_string(),
                        actual: source.name().to_string(),
                    });
                }
                Some(obj)
            }
            other => return Err(mismatch(&other)),
        };
        array.storage_mut().write_ref(index, item)
    };

    if written {
        Ok(())
    } else {
        Err(RuntimeError::ArrayTypeMismatch {
            expected: element.name().to_string(),
            actual: value_type_name(system, &load_array(array, index)?),
        })
    }
}

/// Replace an addressable reference by the contents of its slot
fn unwrap_reference(system: &TypeSystem, value: Value) -> RuntimeResult<Value> {
    match value {
        Value::Object(ObjectRef::Reference(reference)) => reference.load(system),
        other => Ok(other),
    }
}

fn value_type_name(system: &TypeSystem, value: &Value) -> String {
    match system.type_of(value) {
        Ok(Some(ty)) => ty.name().to_string(),
        Ok(None) => "null".to_string(),
        Err(_) => "<unresolved>".to_string(),
    }
}

fn not_indexable(system: &TypeSystem, container: &ObjectRef) -> RuntimeError {
    let name = system
        .object_type_of(container)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|_| "<unresolved>".to_string());
    RuntimeError::InvalidOperation(format!("{} has no indexed elements", name))
}
