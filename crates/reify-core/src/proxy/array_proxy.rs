//! Collection proxy over an array or string
//!
//! One implementation serves every collection interface; it is parameterized
//! only by the subject's element type.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::boxing;
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{HostArray, HostString, Monitor, MonitorGuard, ObjectRef, Primitive, Value};
use crate::runtime::TypeSystem;
use crate::types::{TypeId, TypeRef, VarianceChecker};

/// What a proxy stands in front of
#[derive(Debug, Clone)]
pub enum ProxySubject {
    /// Host array
    Array(Arc<HostArray>),
    /// String viewed as a read-only `char[]`
    Chars(Arc<HostString>),
}

impl ProxySubject {
    /// Identity key of the subject
    pub(crate) fn key(&self) -> usize {
        match self {
            ProxySubject::Array(a) => Arc::as_ptr(a) as usize,
            ProxySubject::Chars(s) => Arc::as_ptr(s) as usize,
        }
    }

    /// The subject as an object reference
    pub fn as_object(&self) -> ObjectRef {
        match self {
            ProxySubject::Array(a) => ObjectRef::Array(a.clone()),
            ProxySubject::Chars(s) => ObjectRef::String(s.clone()),
        }
    }

    fn monitor(&self) -> &Monitor {
        match self {
            ProxySubject::Array(a) => a.monitor(),
            ProxySubject::Chars(s) => s.monitor(),
        }
    }
}

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a base proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyId(u64);

impl ProxyId {
    fn next() -> Self {
        Self(NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Per-subject proxy state shared by every handle
///
/// Cached strongly in the factory slot for as long as the subject lives.
pub(crate) struct ProxyCore {
    id: ProxyId,
    subject_type: TypeRef,
    satisfied: DashMap<TypeId, bool, FxBuildHasher>,
}

impl ProxyCore {
    pub(crate) fn new(system: &TypeSystem, subject: &ProxySubject) -> RuntimeResult<Self> {
        let subject_type = match subject {
            ProxySubject::Array(a) => a.ty().clone(),
            ProxySubject::Chars(_) => {
                let ch = system.primitive_type(crate::host::PrimitiveKind::Char)?;
                system.make_array_type(&ch)?
            }
        };
        Ok(Self {
            id: ProxyId::next(),
            subject_type,
            satisfied: DashMap::with_hasher(FxBuildHasher),
        })
    }

    pub(crate) fn subject_type(&self) -> &TypeRef {
        &self.subject_type
    }
}

/// Proxy letting an array satisfy collection-interface casts
///
/// A handle pairing the subject with its base proxy state. Handles for the
/// same subject share one base; compare them with [`ArrayProxy::same_base`].
pub struct ArrayProxy {
    subject: ProxySubject,
    core: Arc<ProxyCore>,
}

impl ArrayProxy {
    pub(crate) fn with_core(subject: ProxySubject, core: Arc<ProxyCore>) -> Self {
        Self { subject, core }
    }

    #[cfg(test)]
    pub(crate) fn new(system: &TypeSystem, subject: ProxySubject) -> RuntimeResult<Self> {
        let core = Arc::new(ProxyCore::new(system, &subject)?);
        Ok(Self::with_core(subject, core))
    }

    /// ID of the base proxy behind this handle
    pub fn base_id(&self) -> ProxyId {
        self.core.id
    }

    /// Check if both handles route through the same base proxy
    pub fn same_base(&self, other: &ArrayProxy) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// The proxied object
    pub fn subject(&self) -> &ProxySubject {
        &self.subject
    }

    /// Array type the proxy presents (`char[]` for strings)
    pub fn subject_type(&self) -> &TypeRef {
        &self.core.subject_type
    }

    /// Element type
    pub fn element_type(&self) -> Option<&TypeRef> {
        self.core.subject_type.element_type()
    }

    /// Check if writes are rejected
    pub fn is_read_only(&self) -> bool {
        matches!(self.subject, ProxySubject::Chars(_))
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match &self.subject {
            ProxySubject::Array(a) => a.len(),
            ProxySubject::Chars(s) => s.len(),
        }
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> RuntimeResult<Value> {
        match &self.subject {
            ProxySubject::Array(a) => boxing::load_array(a, index),
            ProxySubject::Chars(s) => s
                .char_at(index)
                .map(|c| Value::Primitive(Primitive::Char(c)))
                .ok_or(RuntimeError::IndexOutOfRange {
                    index,
                    length: s.len(),
                }),
        }
    }

    /// Overwrite the element at `index`
    pub fn set(&self, system: &TypeSystem, index: usize, value: Value) -> RuntimeResult<()> {
        match &self.subject {
            ProxySubject::Array(a) => boxing::store_array(system, a, index, value),
            ProxySubject::Chars(_) => Err(RuntimeError::InvalidOperation(
                "collection is read-only".to_string(),
            )),
        }
    }

    /// Position of the first element equal to `value`
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        (0..self.len()).find(|&i| {
            self.get(i)
                .map(|element| values_equal(&element, value))
                .unwrap_or(false)
        })
    }

    /// Check if any element equals `value`
    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    /// Copy of every element
    pub fn to_vec(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.get(i).ok()).collect()
    }

    /// The subject's monitor
    pub fn monitor(&self) -> &Monitor {
        self.subject.monitor()
    }

    /// Lock the subject
    pub fn lock(&self) -> MonitorGuard<'_> {
        self.monitor().enter()
    }

    /// Check whether the subject satisfies the constructed interface `target`
    ///
    /// The answer is cached per target on the base proxy.
    pub fn satisfies(&self, system: &TypeSystem, target: &TypeRef) -> bool {
        let core = &self.core;
        if let Some(known) = core.satisfied.get(&target.id()) {
            trace!(target = %target.name(), "proxy interface check cached");
            return *known;
        }
        let ok = VarianceChecker::new(system).is_assignable(target, &core.subject_type);
        core.satisfied.insert(target.id(), ok);
        ok
    }
}

impl std::fmt::Debug for ArrayProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayProxy")
            .field("subject_type", &self.core.subject_type.name())
            .field("len", &self.len())
            .finish()
    }
}

/// Element equality used by `contains`/`index_of`
///
/// Strings and boxes compare by content, other objects by reference.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(ObjectRef::String(x)), Value::Object(ObjectRef::String(y))) => {
            x.as_str() == y.as_str()
        }
        (Value::Object(ObjectRef::Boxed(x)), Value::Object(ObjectRef::Boxed(y))) => {
            x.value() == y.value()
        }
        (Value::Object(ObjectRef::Boxed(x)), other) | (other, Value::Object(ObjectRef::Boxed(x))) => {
            x.value() == other
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PrimitiveKind;

    #[test]
    fn test_array_proxy_reads_and_writes_through() {
        let system = TypeSystem::with_defaults();
        let int = system.primitive_type(PrimitiveKind::I32).unwrap();
        let array = system
            .new_array_from(&int, vec![Value::from(1), Value::from(2), Value::from(3)])
            .unwrap();
        let proxy = ArrayProxy::new(&system, ProxySubject::Array(array.clone())).unwrap();

        assert_eq!(proxy.len(), 3);
        assert!(!proxy.is_read_only());
        assert_eq!(proxy.index_of(&Value::from(3)), Some(2));
        assert!(!proxy.contains(&Value::from(4)));

        proxy.set(&system, 0, Value::from(10)).unwrap();
        assert_eq!(array.get(0), Some(Value::from(10)));
        assert_eq!(
            proxy.to_vec(),
            vec![Value::from(10), Value::from(2), Value::from(3)]
        );
    }

    #[test]
    fn test_string_proxy_is_read_only_char_array() {
        let system = TypeSystem::with_defaults();
        let s = system.new_string("hi");
        let proxy = ArrayProxy::new(&system, ProxySubject::Chars(s)).unwrap();

        assert!(proxy.is_read_only());
        assert_eq!(proxy.subject_type().name(), "System.Char[]");
        assert_eq!(
            proxy.get(1).unwrap(),
            Value::Primitive(Primitive::Char(b'i' as u16))
        );
        assert!(proxy.set(&system, 0, Value::from(1)).is_err());
    }

    #[test]
    fn test_handles_share_satisfied_cache() {
        let system = TypeSystem::with_defaults();
        let int = system.primitive_type(PrimitiveKind::I32).unwrap();
        let array = system.new_array(&int, 1).unwrap();
        let first = ArrayProxy::new(&system, ProxySubject::Array(array.clone())).unwrap();
        let second = ArrayProxy::with_core(ProxySubject::Array(array), first.core.clone());

        let list = system
            .type_for_class(&system.environment().collections().generic_list)
            .unwrap();
        let list_of_int = system
            .make_generic_type(&list, Some(std::slice::from_ref(&int)))
            .unwrap();
        assert!(first.satisfies(&system, &list_of_int));
        assert!(second.core.satisfied.contains_key(&list_of_int.id()));
        assert!(first.same_base(&second));
        assert_eq!(first.base_id(), second.base_id());
    }

    #[test]
    fn test_boxed_values_compare_by_content() {
        let system = TypeSystem::with_defaults();
        let boxed = system.box_value(Value::from(5)).unwrap();
        assert!(values_equal(&boxed, &Value::from(5)));
        assert!(values_equal(&Value::from(5), &boxed));
        assert!(!values_equal(&boxed, &Value::from(6)));
    }
}
