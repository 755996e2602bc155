//! Type lookup and supertype resolution

use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, trace};

use super::descriptor::{GenericInfo, Supertypes, TypeDescriptor, TypeKind, TypeRef, TypeShape};
use super::key::TypeKey;
use super::shape::{classify, ClassShape};
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::{same_class, ClassKind, ClassRef, PrimitiveKind, TypeSig};
use crate::runtime::TypeSystem;

impl TypeSystem {
    /// Resolve a host class, optionally applied to type arguments
    pub fn lookup(&self, class: &ClassRef, args: Option<&[TypeRef]>) -> RuntimeResult<TypeRef> {
        match args {
            None => self.type_for_class(class),
            Some(args) if class.kind() == ClassKind::ByRef && args.len() == 1 => {
                self.make_by_ref_type(&args[0])
            }
            Some(args) => {
                let definition = self.type_for_class(class)?;
                self.make_generic_type(&definition, Some(args))
            }
        }
    }

    /// Descriptor of a plain class or generic definition
    ///
    /// Array classes resolve to the array type of their element.
    pub fn type_for_class(&self, class: &ClassRef) -> RuntimeResult<TypeRef> {
        if let Some(element) = class.element().filter(|_| class.is_array()) {
            let element = self.type_for_class(element)?;
            return self.make_array_type(&element);
        }

        let key = TypeKey::class(class);
        if let Some(ty) = self.cache.get(&key) {
            return Ok(ty);
        }

        let guard = self.cache.lock();
        if let Some(ty) = self.cache.get_locked(&guard, &key) {
            return Ok(ty);
        }

        let generic = match classify(class, &self.env) {
            ClassShape::NotGeneric => None,
            ClassShape::Definition(sig) => {
                let parameters = (0..sig.arity)
                    .map(|i| Arc::new(TypeDescriptor::new_parameter(i)))
                    .collect();
                Some(GenericInfo::definition(parameters, sig.variance, sig.static_ctor))
            }
        };
        let ty: TypeRef = Arc::new(TypeDescriptor::new_class(class, generic));
        self.cache.publish(&guard, key, ty.clone());
        debug!(ty = %ty.name(), kind = ?ty.kind(), "published type");
        Ok(ty)
    }

    /// Canonical array type over `element`
    pub fn make_array_type(&self, element: &TypeRef) -> RuntimeResult<TypeRef> {
        if element.is_by_ref() || element.is_void() {
            return Err(RuntimeError::InvalidArgument(format!(
                "cannot create an array of {}",
                element.name()
            )));
        }
        let array_class = self.env.array_class(self.erased_class(element));
        self.derived_type(&array_class, element, |element, class| {
            TypeDescriptor::new_array(element, class)
        })
    }

    /// Canonical by-reference type over `element`
    pub fn make_by_ref_type(&self, element: &TypeRef) -> RuntimeResult<TypeRef> {
        if element.is_by_ref() || element.is_void() {
            return Err(RuntimeError::InvalidArgument(format!(
                "cannot create a by-reference type of {}",
                element.name()
            )));
        }
        let by_ref = self.env.by_ref_class().clone();
        self.derived_type(&by_ref, element, |element, class| {
            TypeDescriptor::new_by_ref(element, class)
        })
    }

    fn derived_type<F>(&self, class: &ClassRef, element: &TypeRef, build: F) -> RuntimeResult<TypeRef>
    where
        F: FnOnce(&TypeRef, ClassRef) -> TypeDescriptor,
    {
        let key = TypeKey::with_args(class, Arc::from(vec![element.clone()]));
        if let Some(ty) = self.cache.get(&key) {
            return Ok(ty);
        }

        let guard = self.cache.lock();
        if let Some(ty) = self.cache.get_locked(&guard, &key) {
            return Ok(ty);
        }
        let ty: TypeRef = Arc::new(build(element, class.clone()));
        self.cache.publish(&guard, key, ty.clone());
        debug!(ty = %ty.name(), "published type");
        Ok(ty)
    }

    /// Host class a descriptor erases to
    pub(crate) fn erased_class<'t>(&'t self, ty: &'t TypeRef) -> &'t ClassRef {
        match ty.shape() {
            TypeShape::Parameter { .. } => self.env.object_class(),
            _ => ty.class().unwrap_or_else(|| self.env.object_class()),
        }
    }

    /// Descriptor of a primitive type
    pub fn primitive_type(&self, kind: PrimitiveKind) -> RuntimeResult<TypeRef> {
        self.type_for_class(self.env.primitive_class(kind))
    }

    /// `System.Object`
    pub fn object_type(&self) -> RuntimeResult<TypeRef> {
        self.type_for_class(self.env.object_class())
    }

    /// `System.String`
    pub fn string_type(&self) -> RuntimeResult<TypeRef> {
        self.type_for_class(self.env.string_class())
    }

    /// `System.Void`
    pub fn void_type(&self) -> RuntimeResult<TypeRef> {
        self.type_for_class(self.env.void_class())
    }

    /// Direct parent of `ty`
    pub fn base_type(&self, ty: &TypeRef) -> RuntimeResult<Option<TypeRef>> {
        Ok(self.supertypes(ty)?.base.clone())
    }

    /// Every interface `ty` implements, directly or transitively
    pub fn interfaces(&self, ty: &TypeRef) -> RuntimeResult<Vec<TypeRef>> {
        Ok(self.supertypes(ty)?.interfaces.clone())
    }

    pub(crate) fn supertypes<'t>(&self, ty: &'t TypeRef) -> RuntimeResult<Cow<'t, Supertypes>> {
        if let Some(resolved) = ty.supertypes_cell().get() {
            return Ok(Cow::Borrowed(resolved));
        }
        let computed = self.compute_supertypes(ty)?;
        // A shell may still be withdrawn, so nothing built on one is kept.
        if computed.mentions_shell() {
            trace!(ty = %ty.name(), "supertypes mention a pending instantiation, not cached");
            return Ok(Cow::Owned(computed));
        }
        // Another thread may have won; both results are equivalent.
        let _ = ty.supertypes_cell().set(computed);
        ty.supertypes_cell().get().map(Cow::Borrowed).ok_or_else(|| {
            RuntimeError::InvalidOperation(format!("supertypes of {} unavailable", ty.name()))
        })
    }

    fn compute_supertypes(&self, ty: &TypeRef) -> RuntimeResult<Supertypes> {
        match ty.shape() {
            TypeShape::ByRef { .. } => Ok(Supertypes {
                base: None,
                interfaces: Vec::new(),
            }),
            TypeShape::Parameter { .. } => Ok(Supertypes {
                base: Some(self.object_type()?),
                interfaces: Vec::new(),
            }),
            TypeShape::Array { element } => self.array_supertypes(element),
            TypeShape::Class => {
                let class = self.erased_class(ty).clone();
                self.class_supertypes(ty, &class)
            }
        }
    }

    fn array_supertypes(&self, element: &TypeRef) -> RuntimeResult<Supertypes> {
        let array_base = self.type_for_class(self.env.array_base())?;
        let mut interfaces = Vec::new();
        // Open element types cannot instantiate the collection interfaces.
        if !element.contains_generic_parameters() {
            for definition in self.env.collections().generic_interfaces() {
                let definition = self.type_for_class(definition)?;
                let iface =
                    self.make_generic_type(&definition, Some(std::slice::from_ref(element)))?;
                self.add_with_closure(&mut interfaces, iface)?;
            }
        }
        for iface in &self.supertypes(&array_base)?.interfaces {
            push_unique(&mut interfaces, iface.clone());
        }
        Ok(Supertypes {
            base: Some(array_base),
            interfaces,
        })
    }

    fn class_supertypes(&self, ty: &TypeRef, class: &ClassRef) -> RuntimeResult<Supertypes> {
        if matches!(class.kind(), ClassKind::Void | ClassKind::ByRef) {
            return Ok(Supertypes {
                base: None,
                interfaces: Vec::new(),
            });
        }

        // Definitions resolve in erased form.
        let args = match ty.kind() {
            TypeKind::Instantiation => Some(ty.generic_arguments()),
            _ => None,
        };

        let base = if class.is_interface() || same_class(class, self.env.object_class()) {
            None
        } else {
            match class.super_class() {
                Some(sig) => Some(self.resolve_sig_or_object(sig, args)?),
                None if class.is_value_type() => {
                    Some(self.type_for_class(self.env.value_type_class())?)
                }
                None => Some(self.object_type()?),
            }
        };

        let mut interfaces = Vec::new();
        for sig in class.interfaces() {
            let iface = self.resolve_sig_or_object(sig, args)?;
            self.add_with_closure(&mut interfaces, iface)?;
        }
        if let Some(base) = &base {
            for iface in &self.supertypes(base)?.interfaces {
                push_unique(&mut interfaces, iface.clone());
            }
        }

        Ok(Supertypes { base, interfaces })
    }

    fn add_with_closure(&self, interfaces: &mut Vec<TypeRef>, iface: TypeRef) -> RuntimeResult<()> {
        let inherited = self.supertypes(&iface)?.interfaces.clone();
        push_unique(interfaces, iface);
        for parent in inherited {
            push_unique(interfaces, parent);
        }
        Ok(())
    }

    fn resolve_sig_or_object(&self, sig: &TypeSig, args: Option<&[TypeRef]>) -> RuntimeResult<TypeRef> {
        match self.resolve_sig(sig, args)? {
            Some(ty) => Ok(ty),
            None => self.object_type(),
        }
    }

    /// Substitute `args` into a supertype template
    ///
    /// `Ok(None)` stands for an erased parameter (no arguments available).
    fn resolve_sig(&self, sig: &TypeSig, args: Option<&[TypeRef]>) -> RuntimeResult<Option<TypeRef>> {
        match sig {
            TypeSig::Class(class) => self.type_for_class(class).map(Some),
            TypeSig::Param(position) => match args {
                None => Ok(None),
                Some(args) => args.get(*position).cloned().map(Some).ok_or_else(|| {
                    RuntimeError::InvalidArgument(format!(
                        "supertype template refers to parameter {} but only {} argument(s) exist",
                        position,
                        args.len()
                    ))
                }),
            },
            TypeSig::Generic(class, templates) => {
                let definition = self.type_for_class(class)?;
                let mut resolved = Vec::with_capacity(templates.len());
                for template in templates {
                    match self.resolve_sig(template, args)? {
                        Some(arg) => resolved.push(arg),
                        None => return Ok(Some(definition)),
                    }
                }
                self.make_generic_type(&definition, Some(&resolved)).map(Some)
            }
            TypeSig::Array(element) => {
                let element = self.resolve_sig_or_object(element, args)?;
                self.make_array_type(&element).map(Some)
            }
        }
    }
}

fn push_unique(list: &mut Vec<TypeRef>, ty: TypeRef) {
    if !list.iter().any(|t| Arc::ptr_eq(t, &ty)) {
        list.push(ty);
    }
}
