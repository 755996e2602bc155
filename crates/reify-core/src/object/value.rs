//! Runtime values

use std::fmt;
use std::sync::Arc;

use super::array::HostArray;
use super::boxed::BoxedValue;
use super::element::ElementRef;
use super::instance::Instance;
use super::monitor::Monitor;
use super::string::HostString;
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::PrimitiveKind;
use crate::proxy::ArrayProxy;
use crate::types::TypeRef;

/// Uniform numeric wrapper for primitive values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Boolean
    Bool(bool),
    /// UTF-16 code unit
    Char(u16),
    /// Signed byte
    I8(i8),
    /// Unsigned byte
    U8(u8),
    /// 16-bit signed
    I16(i16),
    /// 16-bit unsigned
    U16(u16),
    /// 32-bit signed
    I32(i32),
    /// 32-bit unsigned
    U32(u32),
    /// 64-bit signed
    I64(i64),
    /// 64-bit unsigned
    U64(u64),
    /// Single-precision float
    F32(f32),
    /// Double-precision float
    F64(f64),
}

impl Primitive {
    /// Kind of this primitive
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Bool,
            Primitive::Char(_) => PrimitiveKind::Char,
            Primitive::I8(_) => PrimitiveKind::I8,
            Primitive::U8(_) => PrimitiveKind::U8,
            Primitive::I16(_) => PrimitiveKind::I16,
            Primitive::U16(_) => PrimitiveKind::U16,
            Primitive::I32(_) => PrimitiveKind::I32,
            Primitive::U32(_) => PrimitiveKind::U32,
            Primitive::I64(_) => PrimitiveKind::I64,
            Primitive::U64(_) => PrimitiveKind::U64,
            Primitive::F32(_) => PrimitiveKind::F32,
            Primitive::F64(_) => PrimitiveKind::F64,
        }
    }

    /// Zero value of `kind`
    pub fn default_for(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => Primitive::Bool(false),
            PrimitiveKind::Char => Primitive::Char(0),
            PrimitiveKind::I8 => Primitive::I8(0),
            PrimitiveKind::U8 => Primitive::U8(0),
            PrimitiveKind::I16 => Primitive::I16(0),
            PrimitiveKind::U16 => Primitive::U16(0),
            PrimitiveKind::I32 => Primitive::I32(0),
            PrimitiveKind::U32 => Primitive::U32(0),
            PrimitiveKind::I64 => Primitive::I64(0),
            PrimitiveKind::U64 => Primitive::U64(0),
            PrimitiveKind::F32 => Primitive::F32(0.0),
            PrimitiveKind::F64 => Primitive::F64(0.0),
        }
    }
}

/// Value-type instance with copy semantics
#[derive(Debug, Clone)]
pub struct StructValue {
    ty: TypeRef,
    fields: Vec<Value>,
}

impl StructValue {
    /// Create a struct value of exact type `ty`
    pub fn new(ty: TypeRef, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    /// Exact type
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Field values
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Get a field value by index
    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Set a field value by index
    pub fn set_field(&mut self, index: usize, value: Value) -> RuntimeResult<()> {
        let length = self.fields.len();
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(RuntimeError::IndexOutOfRange { index, length })?;
        *slot = value;
        Ok(())
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) && self.fields == other.fields
    }
}

/// Reference to a heap object
#[derive(Clone)]
pub enum ObjectRef {
    /// Array of any element kind
    Array(Arc<HostArray>),
    /// Immutable string
    String(Arc<HostString>),
    /// Class instance
    Instance(Arc<Instance>),
    /// Boxed primitive or struct
    Boxed(Arc<BoxedValue>),
    /// Addressable element reference
    Reference(Arc<ElementRef>),
    /// Collection-interface proxy
    Proxy(Arc<ArrayProxy>),
}

impl ObjectRef {
    /// Check if both refer to the same object
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        match (self, other) {
            (ObjectRef::Array(a), ObjectRef::Array(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::String(a), ObjectRef::String(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Instance(a), ObjectRef::Instance(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Boxed(a), ObjectRef::Boxed(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Reference(a), ObjectRef::Reference(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Proxy(a), ObjectRef::Proxy(b)) => a.same_base(b),
            _ => false,
        }
    }

    /// The object's own monitor; a proxy answers with its subject's
    pub fn monitor(&self) -> &Monitor {
        match self {
            ObjectRef::Array(a) => a.monitor(),
            ObjectRef::String(s) => s.monitor(),
            ObjectRef::Instance(i) => i.monitor(),
            ObjectRef::Boxed(b) => b.monitor(),
            ObjectRef::Reference(r) => r.monitor(),
            ObjectRef::Proxy(p) => p.monitor(),
        }
    }

    /// Array behind this reference, if it is one
    pub fn as_array(&self) -> Option<&Arc<HostArray>> {
        match self {
            ObjectRef::Array(a) => Some(a),
            _ => None,
        }
    }

    /// String behind this reference, if it is one
    pub fn as_string(&self) -> Option<&Arc<HostString>> {
        match self {
            ObjectRef::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Array(a) => write!(f, "Array({}, len {})", a.ty().name(), a.len()),
            ObjectRef::String(s) => write!(f, "String({:?})", s.as_str()),
            ObjectRef::Instance(i) => write!(f, "Instance({})", i.ty().name()),
            ObjectRef::Boxed(b) => write!(f, "Boxed({:?})", b.value()),
            ObjectRef::Reference(r) => write!(f, "Reference(index {})", r.index()),
            ObjectRef::Proxy(p) => write!(f, "Proxy({})", p.subject_type().name()),
        }
    }
}

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Null reference
    #[default]
    Null,
    /// Unboxed primitive
    Primitive(Primitive),
    /// Unboxed value-type instance
    Struct(StructValue),
    /// Heap reference
    Object(ObjectRef),
}

impl Value {
    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive payload
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Value::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Struct payload
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get as i32 (if it is one)
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Primitive(Primitive::I32(v)) => Some(*v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        Value::Primitive(p)
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Primitive(Primitive::Bool(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Primitive(Primitive::I32(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Primitive(Primitive::I64(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Primitive(Primitive::F64(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_kinds() {
        assert_eq!(Primitive::I32(1).kind(), PrimitiveKind::I32);
        assert_eq!(Primitive::default_for(PrimitiveKind::F64), Primitive::F64(0.0));
        for kind in PrimitiveKind::ALL {
            assert_eq!(Primitive::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::from(3), Value::Primitive(Primitive::I32(3)));
        assert_ne!(Value::from(3), Value::from(3i64));
        assert_eq!(Value::Null, Value::default());
        assert_eq!(Value::from(7).as_i32(), Some(7));
    }
}
