//! Type descriptors
//!
//! A [`TypeDescriptor`] is the runtime's notion of "a type". Descriptors are
//! only ever created by the identity cache, and two descriptors denote the
//! same type exactly when they are the same allocation.

use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::shape::Variance;
use crate::host::{ClassKind, ClassRef, PrimitiveKind, StaticDataCtor};

/// Shared reference to a canonical type descriptor
pub type TypeRef = Arc<TypeDescriptor>;

/// Opaque per-instantiation static state
pub type StaticData = Arc<dyn Any + Send + Sync>;

/// Global counter for type IDs
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a type descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u64);

impl TypeId {
    /// Allocate the next type ID
    pub fn new() -> Self {
        Self(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural shape of a descriptor
#[derive(Debug, Clone)]
pub enum TypeShape {
    /// Backed by a host class (plain, generic definition or instantiation)
    Class,
    /// Generic parameter placeholder of a definition
    Parameter {
        /// Position in the declaring definition's parameter list
        position: usize,
    },
    /// Single-dimensional array
    Array {
        /// Element type
        element: TypeRef,
    },
    /// Managed by-reference type
    ByRef {
        /// Referenced type
        element: TypeRef,
    },
}

/// Generic role of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Takes no part in generics
    NotGeneric,
    /// Unparameterized generic definition
    GenericDefinition,
    /// Concrete instantiation of a definition
    Instantiation,
    /// Generic parameter placeholder
    Parameter,
}

/// Generic metadata of a definition or instantiation
pub struct GenericInfo {
    /// Definition this was instantiated from; `None` when this is the definition
    primary: Option<TypeRef>,
    /// Type arguments; `None` for a definition
    arguments: Option<Arc<[TypeRef]>>,
    /// Parameter placeholders; only populated on the definition
    parameters: Vec<TypeRef>,
    arity: usize,
    variance: Option<Arc<str>>,
    static_ctor: Option<StaticDataCtor>,
    static_data: OnceCell<StaticData>,
}

impl GenericInfo {
    pub(crate) fn definition(
        parameters: Vec<TypeRef>,
        variance: Option<Arc<str>>,
        static_ctor: Option<StaticDataCtor>,
    ) -> Self {
        Self {
            primary: None,
            arguments: None,
            arity: parameters.len(),
            parameters,
            variance,
            static_ctor,
            static_data: OnceCell::new(),
        }
    }

    fn instantiation(definition: &TypeRef, def_info: &GenericInfo, arguments: Arc<[TypeRef]>) -> Self {
        Self {
            primary: Some(definition.clone()),
            arity: arguments.len(),
            arguments: Some(arguments),
            parameters: Vec::new(),
            variance: def_info.variance.clone(),
            static_ctor: def_info.static_ctor.clone(),
            static_data: OnceCell::new(),
        }
    }

    /// The generic definition, or `None` if this info belongs to the definition itself
    pub fn primary(&self) -> Option<&TypeRef> {
        self.primary.as_ref()
    }

    /// Type arguments of an instantiation
    pub fn arguments(&self) -> Option<&[TypeRef]> {
        self.arguments.as_deref()
    }

    /// Parameter placeholders of a definition
    pub fn parameters(&self) -> &[TypeRef] {
        &self.parameters
    }

    /// Number of type parameters
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Declared variance string, if any
    pub fn variance(&self) -> Option<&str> {
        self.variance.as_deref()
    }

    /// Whether the definition declares per-instantiation static data
    pub fn has_static_data(&self) -> bool {
        self.static_ctor.is_some()
    }

    /// Bound static data, if any
    pub fn static_data(&self) -> Option<&StaticData> {
        self.static_data.get()
    }

    pub(crate) fn static_ctor(&self) -> Option<&StaticDataCtor> {
        self.static_ctor.as_ref()
    }

    pub(crate) fn static_data_cell(&self) -> &OnceCell<StaticData> {
        &self.static_data
    }
}

impl fmt::Debug for GenericInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericInfo")
            .field("primary", &self.primary.as_ref().map(|p| p.name().to_string()))
            .field("arity", &self.arity)
            .field("variance", &self.variance)
            .field("static_ctor", &self.static_ctor.is_some())
            .field("bound", &self.static_data.get().is_some())
            .finish()
    }
}

/// Resolved parent and transitive interface set
#[derive(Debug, Clone)]
pub(crate) struct Supertypes {
    pub(crate) base: Option<TypeRef>,
    pub(crate) interfaces: Vec<TypeRef>,
}

impl Supertypes {
    /// Check if any supertype is built from an unfinished instantiation
    pub(crate) fn mentions_shell(&self) -> bool {
        self.base.iter().chain(&self.interfaces).any(|t| t.mentions_shell())
    }
}

/// A canonical runtime type
pub struct TypeDescriptor {
    id: TypeId,
    name: String,
    class: Option<ClassRef>,
    shape: TypeShape,
    generic: Option<GenericInfo>,
    supertypes: OnceCell<Supertypes>,
    initialized: AtomicBool,
}

impl TypeDescriptor {
    fn build(
        name: String,
        class: Option<ClassRef>,
        shape: TypeShape,
        generic: Option<GenericInfo>,
        initialized: bool,
    ) -> Self {
        Self {
            id: TypeId::new(),
            name,
            class,
            shape,
            generic,
            supertypes: OnceCell::new(),
            initialized: AtomicBool::new(initialized),
        }
    }

    pub(crate) fn new_class(class: &ClassRef, generic: Option<GenericInfo>) -> Self {
        Self::build(
            class.name().to_string(),
            Some(class.clone()),
            TypeShape::Class,
            generic,
            true,
        )
    }

    pub(crate) fn new_parameter(position: usize) -> Self {
        Self::build(
            format!("T{}", position),
            None,
            TypeShape::Parameter { position },
            None,
            true,
        )
    }

    pub(crate) fn new_array(element: &TypeRef, array_class: ClassRef) -> Self {
        Self::build(
            format!("{}[]", element.name()),
            Some(array_class),
            TypeShape::Array {
                element: element.clone(),
            },
            None,
            !element.mentions_shell(),
        )
    }

    pub(crate) fn new_by_ref(element: &TypeRef, by_ref_class: ClassRef) -> Self {
        Self::build(
            format!("{}&", element.name()),
            Some(by_ref_class),
            TypeShape::ByRef {
                element: element.clone(),
            },
            None,
            !element.mentions_shell(),
        )
    }

    /// Shell of an instantiation; not initialized until its static data is bound
    pub(crate) fn new_instantiation(
        definition: &TypeRef,
        def_info: &GenericInfo,
        arguments: Arc<[TypeRef]>,
    ) -> Self {
        let args = arguments
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(",");
        Self::build(
            format!("{}[{}]", definition.name(), args),
            definition.class.clone(),
            TypeShape::Class,
            Some(GenericInfo::instantiation(definition, def_info, arguments)),
            false,
        )
    }

    /// Unique ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing host class (erased for instantiations)
    pub fn class(&self) -> Option<&ClassRef> {
        self.class.as_ref()
    }

    /// Structural shape
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Generic metadata
    pub fn generic_info(&self) -> Option<&GenericInfo> {
        self.generic.as_ref()
    }

    /// Generic role
    pub fn kind(&self) -> TypeKind {
        if let TypeShape::Parameter { .. } = self.shape {
            return TypeKind::Parameter;
        }
        match &self.generic {
            None => TypeKind::NotGeneric,
            Some(info) if info.primary.is_none() => TypeKind::GenericDefinition,
            Some(_) => TypeKind::Instantiation,
        }
    }

    fn class_kind(&self) -> Option<ClassKind> {
        match self.shape {
            TypeShape::Class => self.class.as_ref().map(|c| c.kind()),
            _ => None,
        }
    }

    /// Check if values of this type are copied rather than shared
    pub fn is_value_type(&self) -> bool {
        matches!(
            self.class_kind(),
            Some(ClassKind::ValueType) | Some(ClassKind::Primitive(_))
        )
    }

    /// Check if this is an interface
    pub fn is_interface(&self) -> bool {
        self.class_kind() == Some(ClassKind::Interface)
    }

    /// Check if this is an array type
    pub fn is_array(&self) -> bool {
        matches!(self.shape, TypeShape::Array { .. })
    }

    /// Check if this is a by-reference type
    pub fn is_by_ref(&self) -> bool {
        matches!(self.shape, TypeShape::ByRef { .. }) || self.class_kind() == Some(ClassKind::ByRef)
    }

    /// Check if this is `System.Void`
    pub fn is_void(&self) -> bool {
        self.class_kind() == Some(ClassKind::Void)
    }

    /// Check if this is a generic parameter placeholder
    pub fn is_generic_parameter(&self) -> bool {
        matches!(self.shape, TypeShape::Parameter { .. })
    }

    /// Primitive kind of a primitive type
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.class_kind() {
            Some(ClassKind::Primitive(kind)) => Some(kind),
            _ => None,
        }
    }

    /// Element type of an array or by-ref type
    pub fn element_type(&self) -> Option<&TypeRef> {
        match &self.shape {
            TypeShape::Array { element } | TypeShape::ByRef { element } => Some(element),
            _ => None,
        }
    }

    /// The generic definition of a definition or instantiation
    pub fn generic_type_definition(self: &Arc<Self>) -> Option<TypeRef> {
        let info = self.generic.as_ref()?;
        Some(info.primary.clone().unwrap_or_else(|| self.clone()))
    }

    /// Type arguments of an instantiation (empty otherwise)
    pub fn generic_arguments(&self) -> &[TypeRef] {
        self.generic
            .as_ref()
            .and_then(GenericInfo::arguments)
            .unwrap_or(&[])
    }

    /// Parameter placeholders of a definition (empty otherwise)
    pub fn generic_parameters(&self) -> &[TypeRef] {
        self.generic
            .as_ref()
            .map(GenericInfo::parameters)
            .unwrap_or(&[])
    }

    /// Declared variance at `position`; `None` when no variance string was declared
    pub fn variance_of(&self, position: usize) -> Option<Variance> {
        let info = self.generic.as_ref()?;
        Variance::at(info.variance(), position)
    }

    /// Check if the type is open (mentions a parameter or is a definition)
    pub fn contains_generic_parameters(&self) -> bool {
        match &self.shape {
            TypeShape::Parameter { .. } => true,
            TypeShape::Array { element } | TypeShape::ByRef { element } => {
                element.contains_generic_parameters()
            }
            TypeShape::Class => match self.kind() {
                TypeKind::GenericDefinition => true,
                TypeKind::Instantiation => self
                    .generic_arguments()
                    .iter()
                    .any(|a| a.contains_generic_parameters()),
                _ => false,
            },
        }
    }

    /// Check if `other` is this type or one it is built from
    pub(crate) fn mentions(&self, other: &TypeRef) -> bool {
        std::ptr::eq(self, Arc::as_ptr(other))
            || self.element_type().is_some_and(|e| e.mentions(other))
            || self.generic_arguments().iter().any(|a| a.mentions(other))
    }

    /// Check if this type, or one it is built from, is still a shell
    pub(crate) fn mentions_shell(&self) -> bool {
        !self.is_initialized()
            || self.element_type().is_some_and(|e| e.mentions_shell())
            || self.generic_arguments().iter().any(|a| a.mentions_shell())
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub(crate) fn supertypes_cell(&self) -> &OnceCell<Supertypes> {
        &self.supertypes
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id.as_u64())
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
