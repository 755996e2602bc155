//! Host arrays
//!
//! Primitive arrays keep unboxed typed storage, value-type arrays keep their
//! elements inline, reference arrays keep nullable object references.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::monitor::Monitor;
use super::value::{ObjectRef, Primitive, StructValue, Value};
use crate::host::PrimitiveKind;
use crate::types::TypeRef;

/// Element storage of a [`HostArray`]
#[derive(Debug, Clone)]
pub enum ArrayStorage {
    /// `bool[]`
    Bool(Vec<bool>),
    /// `char[]`
    Char(Vec<u16>),
    /// `sbyte[]`
    I8(Vec<i8>),
    /// `byte[]`
    U8(Vec<u8>),
    /// `short[]`
    I16(Vec<i16>),
    /// `ushort[]`
    U16(Vec<u16>),
    /// `int[]`
    I32(Vec<i32>),
    /// `uint[]`
    U32(Vec<u32>),
    /// `long[]`
    I64(Vec<i64>),
    /// `ulong[]`
    U64(Vec<u64>),
    /// `float[]`
    F32(Vec<f32>),
    /// `double[]`
    F64(Vec<f64>),
    /// Array of a user value type
    Struct(Vec<StructValue>),
    /// Array of references
    Ref(Vec<Option<ObjectRef>>),
}

impl ArrayStorage {
    /// Zeroed storage for `len` primitives of `kind`
    pub fn for_primitive(kind: PrimitiveKind, len: usize) -> Self {
        match kind {
            PrimitiveKind::Bool => ArrayStorage::Bool(vec![false; len]),
            PrimitiveKind::Char => ArrayStorage::Char(vec![0; len]),
            PrimitiveKind::I8 => ArrayStorage::I8(vec![0; len]),
            PrimitiveKind::U8 => ArrayStorage::U8(vec![0; len]),
            PrimitiveKind::I16 => ArrayStorage::I16(vec![0; len]),
            PrimitiveKind::U16 => ArrayStorage::U16(vec![0; len]),
            PrimitiveKind::I32 => ArrayStorage::I32(vec![0; len]),
            PrimitiveKind::U32 => ArrayStorage::U32(vec![0; len]),
            PrimitiveKind::I64 => ArrayStorage::I64(vec![0; len]),
            PrimitiveKind::U64 => ArrayStorage::U64(vec![0; len]),
            PrimitiveKind::F32 => ArrayStorage::F32(vec![0.0; len]),
            PrimitiveKind::F64 => ArrayStorage::F64(vec![0.0; len]),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayStorage::Bool(v) => v.len(),
            ArrayStorage::Char(v) | ArrayStorage::U16(v) => v.len(),
            ArrayStorage::I8(v) => v.len(),
            ArrayStorage::U8(v) => v.len(),
            ArrayStorage::I16(v) => v.len(),
            ArrayStorage::I32(v) => v.len(),
            ArrayStorage::U32(v) => v.len(),
            ArrayStorage::I64(v) => v.len(),
            ArrayStorage::U64(v) => v.len(),
            ArrayStorage::F32(v) => v.len(),
            ArrayStorage::F64(v) => v.len(),
            ArrayStorage::Struct(v) => v.len(),
            ArrayStorage::Ref(v) => v.len(),
        }
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Primitive kind of typed storage
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            ArrayStorage::Bool(_) => PrimitiveKind::Bool,
            ArrayStorage::Char(_) => PrimitiveKind::Char,
            ArrayStorage::I8(_) => PrimitiveKind::I8,
            ArrayStorage::U8(_) => PrimitiveKind::U8,
            ArrayStorage::I16(_) => PrimitiveKind::I16,
            ArrayStorage::U16(_) => PrimitiveKind::U16,
            ArrayStorage::I32(_) => PrimitiveKind::I32,
            ArrayStorage::U32(_) => PrimitiveKind::U32,
            ArrayStorage::I64(_) => PrimitiveKind::I64,
            ArrayStorage::U64(_) => PrimitiveKind::U64,
            ArrayStorage::F32(_) => PrimitiveKind::F32,
            ArrayStorage::F64(_) => PrimitiveKind::F64,
            ArrayStorage::Struct(_) | ArrayStorage::Ref(_) => return None,
        })
    }

    /// Element at `index` as a value
    pub fn load(&self, index: usize) -> Option<Value> {
        let value: Value = match self {
            ArrayStorage::Bool(v) => Primitive::Bool(*v.get(index)?).into(),
            ArrayStorage::Char(v) => Primitive::Char(*v.get(index)?).into(),
            ArrayStorage::I8(v) => Primitive::I8(*v.get(index)?).into(),
            ArrayStorage::U8(v) => Primitive::U8(*v.get(index)?).into(),
            ArrayStorage::I16(v) => Primitive::I16(*v.get(index)?).into(),
            ArrayStorage::U16(v) => Primitive::U16(*v.get(index)?).into(),
            ArrayStorage::I32(v) => Primitive::I32(*v.get(index)?).into(),
            ArrayStorage::U32(v) => Primitive::U32(*v.get(index)?).into(),
            ArrayStorage::I64(v) => Primitive::I64(*v.get(index)?).into(),
            ArrayStorage::U64(v) => Primitive::U64(*v.get(index)?).into(),
            ArrayStorage::F32(v) => Primitive::F32(*v.get(index)?).into(),
            ArrayStorage::F64(v) => Primitive::F64(*v.get(index)?).into(),
            ArrayStorage::Struct(v) => Value::Struct(v.get(index)?.clone()),
            ArrayStorage::Ref(v) => match v.get(index)? {
                Some(obj) => Value::Object(obj.clone()),
                None => Value::Null,
            },
        };
        Some(value)
    }

    /// Write a primitive of the storage's own kind; `false` on kind mismatch
    pub(crate) fn write_primitive(&mut self, index: usize, value: Primitive) -> bool {
        let slot_written = match (self, value) {
            (ArrayStorage::Bool(v), Primitive::Bool(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::Char(v), Primitive::Char(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::I8(v), Primitive::I8(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::U8(v), Primitive::U8(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::I16(v), Primitive::I16(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::U16(v), Primitive::U16(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::I32(v), Primitive::I32(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::U32(v), Primitive::U32(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::I64(v), Primitive::I64(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::U64(v), Primitive::U64(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::F32(v), Primitive::F32(x)) => v.get_mut(index).map(|s| *s = x),
            (ArrayStorage::F64(v), Primitive::F64(x)) => v.get_mut(index).map(|s| *s = x),
            _ => None,
        };
        slot_written.is_some()
    }

    /// Write a struct element; `false` if this is not struct storage
    pub(crate) fn write_struct(&mut self, index: usize, value: StructValue) -> bool {
        match self {
            ArrayStorage::Struct(v) => v.get_mut(index).map(|s| *s = value).is_some(),
            _ => false,
        }
    }

    /// Write a reference element; `false` if this is not reference storage
    pub(crate) fn write_ref(&mut self, index: usize, value: Option<ObjectRef>) -> bool {
        match self {
            ArrayStorage::Ref(v) => v.get_mut(index).map(|s| *s = value).is_some(),
            _ => false,
        }
    }
}

/// Host array object
pub struct HostArray {
    ty: TypeRef,
    storage: RwLock<ArrayStorage>,
    monitor: Monitor,
}

impl HostArray {
    /// Create an array of type `ty` over `storage`
    pub fn new(ty: TypeRef, storage: ArrayStorage) -> Self {
        Self {
            ty,
            storage: RwLock::new(storage),
            monitor: Monitor::new(),
        }
    }

    /// Array type
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Element type
    pub fn element_type(&self) -> Option<&TypeRef> {
        self.ty.element_type()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the elements
    pub fn storage(&self) -> RwLockReadGuard<'_, ArrayStorage> {
        self.storage.read()
    }

    pub(crate) fn storage_mut(&self) -> RwLockWriteGuard<'_, ArrayStorage> {
        self.storage.write()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.storage.read().load(index)
    }

    /// Array monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

impl std::fmt::Debug for HostArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostArray")
            .field("ty", &self.ty.name())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_storage() {
        let mut storage = ArrayStorage::for_primitive(PrimitiveKind::I32, 3);
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.primitive_kind(), Some(PrimitiveKind::I32));
        assert!(storage.write_primitive(1, Primitive::I32(42)));
        assert_eq!(storage.load(1), Some(Value::from(42)));
        assert_eq!(storage.load(0), Some(Value::from(0)));
        assert!(storage.load(3).is_none());
    }

    #[test]
    fn test_primitive_storage_rejects_other_kinds() {
        let mut storage = ArrayStorage::for_primitive(PrimitiveKind::I32, 2);
        assert!(!storage.write_primitive(0, Primitive::I64(1)));
        assert!(!storage.write_primitive(5, Primitive::I32(1)));
        assert!(!storage.write_ref(0, None));
        assert_eq!(storage.load(0), Some(Value::from(0)));
    }

    #[test]
    fn test_ref_storage() {
        let mut storage = ArrayStorage::Ref(vec![None; 2]);
        assert!(storage.primitive_kind().is_none());
        assert_eq!(storage.load(0), Some(Value::Null));
        assert!(storage.write_ref(1, None));
        assert!(!storage.write_primitive(1, Primitive::Bool(true)));
    }
}
