//! Type system facade
//!
//! [`TypeSystem`] ties the host environment, the identity cache and the
//! proxy factory together and exposes type lookup, casting, proxying and
//! object creation to the rest of the runtime. Type lookup itself lives in
//! [`crate::types`]; this module covers everything that works on values.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::warn;

use crate::boxing;
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::{ClassRef, HostEnvironment};
use crate::object::{ArrayStorage, BoxedValue, HostArray, HostString, Instance, ObjectRef, StructValue, Value};
use crate::options::RuntimeOptions;
use crate::proxy::{classify_request, ArrayProxy, ArrayProxyFactory, ProxySubject};
use crate::types::{TypeIdentityCache, TypeKind, TypeRef, VarianceChecker};

/// Process-wide type system
static GLOBAL: OnceCell<TypeSystem> = OnceCell::new();

/// Cache occupancy snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Published type descriptors
    pub types: usize,
    /// Proxy slots whose subject is still alive
    pub live_proxies: usize,
}

/// The runtime type system
pub struct TypeSystem {
    pub(crate) env: HostEnvironment,
    pub(crate) options: RuntimeOptions,
    pub(crate) cache: TypeIdentityCache,
    pub(crate) proxies: ArrayProxyFactory,
}

impl TypeSystem {
    /// Create an independent type system
    pub fn new(env: HostEnvironment, options: RuntimeOptions) -> Self {
        Self {
            cache: TypeIdentityCache::with_capacity(options.type_cache_capacity),
            proxies: ArrayProxyFactory::new(options.proxy_sweep_interval),
            env,
            options,
        }
    }

    /// Independent type system with the standard environment and default options
    pub fn with_defaults() -> Self {
        Self::new(HostEnvironment::new(), RuntimeOptions::default())
    }

    /// Install the process-wide type system
    ///
    /// Fails if one was already installed (or lazily created by [`TypeSystem::global`]).
    pub fn install(env: HostEnvironment, options: RuntimeOptions) -> RuntimeResult<&'static TypeSystem> {
        let mut installed = false;
        let system = GLOBAL.get_or_init(|| {
            installed = true;
            TypeSystem::new(env, options)
        });
        if installed {
            Ok(system)
        } else {
            Err(RuntimeError::InvalidOperation(
                "the global type system is already installed".to_string(),
            ))
        }
    }

    /// The process-wide type system, created from the environment on first use
    pub fn global() -> &'static TypeSystem {
        GLOBAL.get_or_init(|| {
            let options = RuntimeOptions::from_env().unwrap_or_else(|error| {
                warn!(%error, "invalid runtime options in environment, using defaults");
                RuntimeOptions::default()
            });
            TypeSystem::new(HostEnvironment::new(), options)
        })
    }

    /// Host environment
    pub fn environment(&self) -> &HostEnvironment {
        &self.env
    }

    /// Options in effect
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Identity cache
    pub fn cache(&self) -> &TypeIdentityCache {
        &self.cache
    }

    /// Proxy factory
    pub fn proxies(&self) -> &ArrayProxyFactory {
        &self.proxies
    }

    /// Assignability checker over this system
    pub fn checker(&self) -> VarianceChecker<'_> {
        VarianceChecker::new(self)
    }

    /// Check if `target` is assignable from `source`
    pub fn is_assignable(&self, target: &TypeRef, source: &TypeRef) -> bool {
        self.checker().is_assignable(target, source)
    }

    /// Cache occupancy
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            types: self.cache.len(),
            live_proxies: self.proxies.live_slots(),
        }
    }

    // ------------------------------------------------------------------
    // Runtime types of values
    // ------------------------------------------------------------------

    /// Runtime type of `value`; `None` for null
    pub fn type_of(&self, value: &Value) -> RuntimeResult<Option<TypeRef>> {
        match value {
            Value::Null => Ok(None),
            Value::Primitive(p) => self.primitive_type(p.kind()).map(Some),
            Value::Struct(s) => Ok(Some(s.ty().clone())),
            Value::Object(obj) => self.object_type_of(obj).map(Some),
        }
    }

    /// Runtime type of a heap object; a proxy reports its subject's type
    pub fn object_type_of(&self, obj: &ObjectRef) -> RuntimeResult<TypeRef> {
        match obj {
            ObjectRef::Array(a) => Ok(a.ty().clone()),
            ObjectRef::String(_) => self.string_type(),
            ObjectRef::Instance(i) => Ok(i.ty().clone()),
            ObjectRef::Boxed(b) => Ok(b.ty().clone()),
            ObjectRef::Reference(_) => self.type_for_class(self.env.reference_class()),
            ObjectRef::Proxy(p) => Ok(p.subject_type().clone()),
        }
    }

    /// Check if `value` is a non-null instance of `ty`
    pub fn is_instance_of(&self, value: &Value, ty: &TypeRef) -> bool {
        match self.type_of(value) {
            Ok(Some(source)) => self.is_assignable(ty, &source),
            Ok(None) => false,
            Err(error) => {
                warn!(%error, "type resolution failed during instance check");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Casting and proxies
    // ------------------------------------------------------------------

    /// Cast `value` to `target`
    ///
    /// Assignable values pass through (primitives and structs are boxed when
    /// the target is a reference type). Boxes unwrap when the target is their
    /// exact value type. Arrays and strings cast to a collection interface
    /// yield their proxy.
    pub fn cast(&self, value: &Value, target: &TypeRef) -> RuntimeResult<Value> {
        let obj = match value {
            Value::Null if target.is_value_type() => {
                return Err(self.cast_error("null", target));
            }
            Value::Null => return Ok(Value::Null),
            Value::Primitive(_) | Value::Struct(_) => {
                let source = self.type_of(value)?.ok_or_else(|| self.cast_error("null", target))?;
                if Arc::ptr_eq(&source, target) {
                    return Ok(value.clone());
                }
                if self.is_assignable(target, &source) {
                    return self.box_value(value.clone());
                }
                return Err(self.cast_error(source.name(), target));
            }
            Value::Object(obj) => obj,
        };

        if let ObjectRef::Boxed(boxed) = obj {
            if Arc::ptr_eq(boxed.ty(), target) {
                return Ok(boxed.value().clone());
            }
        }
        if let Some(proxy) = self.try_proxy(obj, target)? {
            return Ok(Value::Object(ObjectRef::Proxy(proxy)));
        }

        let source = self.object_type_of(obj)?;
        if self.is_assignable(target, &source) {
            Ok(value.clone())
        } else {
            Err(self.cast_error(source.name(), target))
        }
    }

    /// Check if `value` can be cast to the constructed generic interface `target`
    pub fn is_castable_to_generic_interface(&self, value: &Value, target: &TypeRef) -> bool {
        if !target.is_interface() || target.kind() != TypeKind::Instantiation {
            return false;
        }
        if let Value::Object(obj) = value {
            match self.try_proxy(obj, target) {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, target = %target.name(), "proxy lookup failed during cast check");
                    return false;
                }
            }
        }
        self.is_instance_of(value, target)
    }

    /// Collection proxy of `obj` for `target`
    ///
    /// `None` when `obj` is not an array or string, or `target` is not a
    /// collection interface it satisfies. With `throw_on_failure` set, that
    /// case is an [`RuntimeError::InvalidCast`] instead.
    pub fn get_proxy(
        &self,
        obj: &ObjectRef,
        target: &TypeRef,
        throw_on_failure: bool,
    ) -> RuntimeResult<Option<Arc<ArrayProxy>>> {
        match self.try_proxy(obj, target)? {
            Some(proxy) => Ok(Some(proxy)),
            None if throw_on_failure => {
                let source = self.object_type_of(obj)?;
                Err(self.cast_error(source.name(), target))
            }
            None => Ok(None),
        }
    }

    fn try_proxy(&self, obj: &ObjectRef, target: &TypeRef) -> RuntimeResult<Option<Arc<ArrayProxy>>> {
        let subject = match obj {
            ObjectRef::Array(a) if a.ty().is_array() => ProxySubject::Array(a.clone()),
            ObjectRef::String(s) => ProxySubject::Chars(s.clone()),
            ObjectRef::Proxy(p) => p.subject().clone(),
            _ => return Ok(None),
        };
        let Some(request) = classify_request(&self.env, target) else {
            return Ok(None);
        };
        if matches!(subject, ProxySubject::Chars(_)) && !request.permits_string() {
            return Ok(None);
        }
        self.proxies.proxy_for(self, subject, &request)
    }

    fn cast_error(&self, source: &str, target: &TypeRef) -> RuntimeError {
        RuntimeError::InvalidCast {
            source_type: source.to_string(),
            target_type: target.name().to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Object creation
    // ------------------------------------------------------------------

    /// New zeroed array of `len` elements of `element`
    pub fn new_array(&self, element: &TypeRef, len: usize) -> RuntimeResult<Arc<HostArray>> {
        let ty = self.make_array_type(element)?;
        let storage = if let Some(kind) = element.primitive_kind() {
            ArrayStorage::for_primitive(kind, len)
        } else if element.is_value_type() {
            ArrayStorage::Struct(vec![self.default_struct(element)?; len])
        } else {
            ArrayStorage::Ref(vec![None; len])
        };
        Ok(Arc::new(HostArray::new(ty, storage)))
    }

    /// New array holding `values`, each stored with the usual checks
    pub fn new_array_from(&self, element: &TypeRef, values: Vec<Value>) -> RuntimeResult<Arc<HostArray>> {
        let array = self.new_array(element, values.len())?;
        for (index, value) in values.into_iter().enumerate() {
            boxing::store_array(self, &array, index, value)?;
        }
        Ok(array)
    }

    /// New string
    pub fn new_string(&self, text: impl Into<String>) -> Arc<HostString> {
        Arc::new(HostString::new(text))
    }

    /// New instance of the closed reference class `ty`, fields null
    pub fn new_instance(&self, ty: &TypeRef) -> RuntimeResult<Arc<Instance>> {
        let class = self.instantiable_class(ty)?;
        if class.is_interface() || ty.is_value_type() || ty.is_array() {
            return Err(RuntimeError::InvalidArgument(format!(
                "cannot create an instance of {}",
                ty.name()
            )));
        }
        Ok(Arc::new(Instance::new(ty.clone(), class.instance_field_count())))
    }

    /// New struct value of the closed value type `ty`
    pub fn new_struct(&self, ty: &TypeRef, fields: Vec<Value>) -> RuntimeResult<StructValue> {
        let class = self.instantiable_class(ty)?;
        if !ty.is_value_type() || ty.primitive_kind().is_some() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{} is not a user value type",
                ty.name()
            )));
        }
        let expected = class.instance_field_count();
        if fields.len() != expected {
            return Err(RuntimeError::InvalidArgument(format!(
                "{} has {} field(s), got {}",
                ty.name(),
                expected,
                fields.len()
            )));
        }
        Ok(StructValue::new(ty.clone(), fields))
    }

    /// Default value of the value type `ty` (all fields null)
    pub fn default_struct(&self, ty: &TypeRef) -> RuntimeResult<StructValue> {
        let count = self.instantiable_class(ty)?.instance_field_count();
        self.new_struct(ty, vec![Value::Null; count])
    }

    /// Box a primitive or struct; other values are returned unchanged
    pub fn box_value(&self, value: Value) -> RuntimeResult<Value> {
        let ty = match &value {
            Value::Primitive(p) => self.primitive_type(p.kind())?,
            Value::Struct(s) => s.ty().clone(),
            Value::Null | Value::Object(_) => return Ok(value),
        };
        Ok(Value::Object(ObjectRef::Boxed(Arc::new(BoxedValue::new(ty, value)))))
    }

    fn instantiable_class<'t>(&self, ty: &'t TypeRef) -> RuntimeResult<&'t ClassRef> {
        if ty.contains_generic_parameters() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{} is an open generic type",
                ty.name()
            )));
        }
        ty.class().ok_or_else(|| {
            RuntimeError::InvalidArgument(format!("{} has no host class", ty.name()))
        })
    }
}

impl std::fmt::Debug for TypeSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSystem")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .field("proxies", &self.proxies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ClassBuilder, PrimitiveKind};

    #[test]
    fn test_type_of_values() {
        let system = TypeSystem::with_defaults();
        assert!(system.type_of(&Value::Null).unwrap().is_none());
        let int = system.type_of(&Value::from(1)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&int, &system.primitive_type(PrimitiveKind::I32).unwrap()));
        let s = Value::Object(ObjectRef::String(system.new_string("x")));
        assert_eq!(system.type_of(&s).unwrap().unwrap().name(), "System.String");
    }

    #[test]
    fn test_cast_boxes_and_unboxes() {
        let system = TypeSystem::with_defaults();
        let object = system.object_type().unwrap();
        let int = system.primitive_type(PrimitiveKind::I32).unwrap();

        let boxed = system.cast(&Value::from(3), &object).unwrap();
        assert!(matches!(boxed, Value::Object(ObjectRef::Boxed(_))));
        assert_eq!(system.cast(&boxed, &int).unwrap(), Value::from(3));

        let long = system.primitive_type(PrimitiveKind::I64).unwrap();
        let err = system.cast(&boxed, &long).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidCast { .. }));
    }

    #[test]
    fn test_null_casts() {
        let system = TypeSystem::with_defaults();
        let object = system.object_type().unwrap();
        let int = system.primitive_type(PrimitiveKind::I32).unwrap();
        assert_eq!(system.cast(&Value::Null, &object).unwrap(), Value::Null);
        assert!(system.cast(&Value::Null, &int).is_err());
    }

    #[test]
    fn test_new_instance_rejects_interfaces_and_open_types() {
        let system = TypeSystem::with_defaults();
        let env = system.environment();
        let iface = ClassBuilder::interface("IThing").build();
        let generic = ClassBuilder::class("Holder`1").generic(env, 1).build();

        let iface = system.type_for_class(&iface).unwrap();
        let generic = system.type_for_class(&generic).unwrap();
        assert!(system.new_instance(&iface).unwrap_err().is_argument_error());
        assert!(system.new_instance(&generic).unwrap_err().is_argument_error());
    }

    #[test]
    fn test_instance_carries_reified_type() {
        let system = TypeSystem::with_defaults();
        let env = system.environment();
        let holder = ClassBuilder::class("Holder`1")
            .generic(env, 1)
            .instance_field("value")
            .build();
        let holder = system.type_for_class(&holder).unwrap();
        let string = system.string_type().unwrap();
        let of_string = system.make_generic_type(&holder, Some(&[string])).unwrap();

        let instance = system.new_instance(&of_string).unwrap();
        assert_eq!(instance.field_count(), 1);
        let value = Value::Object(ObjectRef::Instance(instance));
        assert!(Arc::ptr_eq(&system.type_of(&value).unwrap().unwrap(), &of_string));
        assert!(system.is_instance_of(&value, &system.object_type().unwrap()));
    }

    #[test]
    fn test_install_only_once() {
        let _ = TypeSystem::install(HostEnvironment::new(), RuntimeOptions::default());
        let again = TypeSystem::install(HostEnvironment::new(), RuntimeOptions::default());
        assert!(matches!(again, Err(RuntimeError::InvalidOperation(_))));
        assert!(std::ptr::eq(TypeSystem::global(), TypeSystem::global()));
    }

    #[test]
    fn test_stats() {
        let system = TypeSystem::with_defaults();
        let before = system.stats();
        system.object_type().unwrap();
        system.string_type().unwrap();
        assert!(system.stats().types >= before.types + 2);
        assert_eq!(system.stats().live_proxies, 0);
    }
}
