//! Host class descriptors
//!
//! A [`HostClass`] is everything the host runtime knows about a class: its
//! name, single-inheritance parent, implemented interfaces, and the reflective
//! shape (methods, fields, nested classes, constructors) the translator emitted.
//! Type arguments are erased here. Generic supertypes are kept as [`TypeSig`]
//! templates that refer to type parameters by position.
//!
//! ## Translator conventions
//!
//! | Member                                    | Meaning                                  |
//! |-------------------------------------------|------------------------------------------|
//! | static method `-generic-info(M, M, ..)`   | generic definition, one `M` per argument |
//! | static constant field `-generic-variance` | variance string (`O`, `I`, other)        |
//! | nested class `<Name>$$static`             | per-instantiation static data            |

use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeResult;
use crate::host::HostEnvironment;
use crate::types::{StaticData, StaticInit};

/// Shared reference to a host class. Identity is reference identity.
pub type ClassRef = Arc<HostClass>;

/// Body of a per-instantiation static-data constructor
pub type StaticDataCtor =
    Arc<dyn Fn(&StaticInit<'_>) -> RuntimeResult<Option<StaticData>> + Send + Sync>;

/// Synthetic static method marking a generic definition
pub const GENERIC_INFO_METHOD: &str = "-generic-info";

/// Static constant field holding the variance string
pub const GENERIC_VARIANCE_FIELD: &str = "-generic-variance";

/// Name suffix of the nested static-data class
pub const STATIC_DATA_SUFFIX: &str = "$$static";

/// Check whether two class references denote the same host class
#[inline]
pub fn same_class(a: &ClassRef, b: &ClassRef) -> bool {
    Arc::ptr_eq(a, b)
}

/// Host primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Boolean
    Bool,
    /// UTF-16 code unit
    Char,
    /// Signed byte
    I8,
    /// Unsigned byte
    U8,
    /// 16-bit signed
    I16,
    /// 16-bit unsigned
    U16,
    /// 32-bit signed
    I32,
    /// 32-bit unsigned
    U32,
    /// 64-bit signed
    I64,
    /// 64-bit unsigned
    U64,
    /// Single-precision float
    F32,
    /// Double-precision float
    F64,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order
    pub const ALL: [PrimitiveKind; 12] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
        PrimitiveKind::I8,
        PrimitiveKind::U8,
        PrimitiveKind::I16,
        PrimitiveKind::U16,
        PrimitiveKind::I32,
        PrimitiveKind::U32,
        PrimitiveKind::I64,
        PrimitiveKind::U64,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
    ];

    /// Source-model class name
    pub fn class_name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "System.Boolean",
            PrimitiveKind::Char => "System.Char",
            PrimitiveKind::I8 => "System.SByte",
            PrimitiveKind::U8 => "System.Byte",
            PrimitiveKind::I16 => "System.Int16",
            PrimitiveKind::U16 => "System.UInt16",
            PrimitiveKind::I32 => "System.Int32",
            PrimitiveKind::U32 => "System.UInt32",
            PrimitiveKind::I64 => "System.Int64",
            PrimitiveKind::U64 => "System.UInt64",
            PrimitiveKind::F32 => "System.Single",
            PrimitiveKind::F64 => "System.Double",
        }
    }

    /// Position in [`PrimitiveKind::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// What sort of class a [`HostClass`] is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Ordinary reference class
    Class,
    /// Interface
    Interface,
    /// User-defined value type
    ValueType,
    /// Built-in primitive
    Primitive(PrimitiveKind),
    /// Host array class (element class in [`HostClass::element`])
    Array,
    /// The void type
    Void,
    /// Host marker for by-reference types
    ByRef,
}

/// Generic-aware reference to a supertype, resolved against type arguments
#[derive(Debug, Clone)]
pub enum TypeSig {
    /// Non-generic class or generic definition used unparameterized
    Class(ClassRef),
    /// Type parameter of the declaring class, by position
    Param(usize),
    /// Generic class applied to argument templates
    Generic(ClassRef, Vec<TypeSig>),
    /// Array of a template
    Array(Box<TypeSig>),
}

impl TypeSig {
    /// Plain class reference
    pub fn class(class: &ClassRef) -> Self {
        TypeSig::Class(class.clone())
    }

    /// Generic class applied to `args`
    pub fn generic(class: &ClassRef, args: Vec<TypeSig>) -> Self {
        TypeSig::Generic(class.clone(), args)
    }

    /// Array of `element`
    pub fn array(element: TypeSig) -> Self {
        TypeSig::Array(Box::new(element))
    }

    /// The host class this template erases to, if it names one directly
    pub fn erased_class(&self) -> Option<&ClassRef> {
        match self {
            TypeSig::Class(c) | TypeSig::Generic(c, _) => Some(c),
            TypeSig::Param(_) | TypeSig::Array(_) => None,
        }
    }
}

/// Reflective view of a host method
#[derive(Debug, Clone)]
pub struct HostMethod {
    /// Method name
    pub name: String,
    /// Whether the method is static
    pub is_static: bool,
    /// Parameter classes
    pub params: Vec<ClassRef>,
}

impl HostMethod {
    /// Static method
    pub fn new_static(name: impl Into<String>, params: Vec<ClassRef>) -> Self {
        Self {
            name: name.into(),
            is_static: true,
            params,
        }
    }

    /// Instance method
    pub fn instance(name: impl Into<String>, params: Vec<ClassRef>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            params,
        }
    }
}

/// Reflective view of a host field
#[derive(Debug, Clone)]
pub struct HostField {
    /// Field name
    pub name: String,
    /// Whether the field is static
    pub is_static: bool,
    /// Compile-time constant value, for static final strings
    pub constant: Option<Arc<str>>,
}

impl HostField {
    /// Instance field
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            constant: None,
        }
    }

    /// Static string constant
    pub fn constant(name: impl Into<String>, value: &str) -> Self {
        Self {
            name: name.into(),
            is_static: true,
            constant: Some(Arc::from(value)),
        }
    }
}

/// Constructor of a nested static-data class
#[derive(Clone)]
pub struct HostConstructor {
    /// Parameter classes
    pub params: Vec<ClassRef>,
    /// Constructor body
    pub body: StaticDataCtor,
}

impl fmt::Debug for HostConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConstructor")
            .field("params", &self.params.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Host class descriptor
pub struct HostClass {
    name: String,
    kind: ClassKind,
    super_class: Option<TypeSig>,
    interfaces: Vec<TypeSig>,
    element: Option<ClassRef>,
    methods: Vec<HostMethod>,
    fields: Vec<HostField>,
    nested: Vec<ClassRef>,
    constructors: Vec<HostConstructor>,
}

impl HostClass {
    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Check if this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Check if instances have value semantics
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, ClassKind::ValueType | ClassKind::Primitive(_))
    }

    /// Primitive kind, if this is a primitive class
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            ClassKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Check if this is a host array class
    pub fn is_array(&self) -> bool {
        self.kind == ClassKind::Array
    }

    /// Element class of an array class
    pub fn element(&self) -> Option<&ClassRef> {
        self.element.as_ref()
    }

    /// Declared parent, if any
    pub fn super_class(&self) -> Option<&TypeSig> {
        self.super_class.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[TypeSig] {
        &self.interfaces
    }

    /// Declared methods
    pub fn methods(&self) -> &[HostMethod] {
        &self.methods
    }

    /// Declared fields
    pub fn fields(&self) -> &[HostField] {
        &self.fields
    }

    /// Nested classes
    pub fn nested_classes(&self) -> &[ClassRef] {
        &self.nested
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[HostConstructor] {
        &self.constructors
    }

    /// Number of instance fields, including those declared by ancestors
    pub fn instance_field_count(&self) -> usize {
        let own = self.fields.iter().filter(|f| !f.is_static).count();
        let inherited = self
            .super_class
            .as_ref()
            .and_then(TypeSig::erased_class)
            .map(|parent| parent.instance_field_count())
            .unwrap_or(0);
        own + inherited
    }
}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for [`HostClass`]
///
/// Plays the part of the translator: besides the plain shape it can emit the
/// generic-definition, variance and static-data conventions.
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    super_class: Option<TypeSig>,
    interfaces: Vec<TypeSig>,
    element: Option<ClassRef>,
    methods: Vec<HostMethod>,
    fields: Vec<HostField>,
    nested: Vec<ClassRef>,
    constructors: Vec<HostConstructor>,
}

impl ClassBuilder {
    /// Start a class of the given kind
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            super_class: None,
            interfaces: Vec::new(),
            element: None,
            methods: Vec::new(),
            fields: Vec::new(),
            nested: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Start a reference class
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Class)
    }

    /// Start an interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Interface)
    }

    /// Start a value type
    pub fn value_type(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::ValueType)
    }

    /// Host array class for `element`
    pub(crate) fn array(element: &ClassRef, array_base: &ClassRef) -> Self {
        let mut builder = Self::new(format!("{}[]", element.name()), ClassKind::Array);
        builder.super_class = Some(TypeSig::class(array_base));
        builder.element = Some(element.clone());
        builder
    }

    /// Set the parent class
    pub fn extends(mut self, parent: TypeSig) -> Self {
        self.super_class = Some(parent);
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: TypeSig) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a method
    pub fn method(mut self, method: HostMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a field
    pub fn field(mut self, field: HostField) -> Self {
        self.fields.push(field);
        self
    }

    /// Add an instance field by name
    pub fn instance_field(self, name: impl Into<String>) -> Self {
        self.field(HostField::instance(name))
    }

    /// Add a nested class
    pub fn nested(mut self, class: ClassRef) -> Self {
        self.nested.push(class);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: HostConstructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Mark the class as a generic definition with `arity` parameters
    pub fn generic(self, env: &HostEnvironment, arity: usize) -> Self {
        self.generic_with_marker(env.generic_marker(), arity)
    }

    pub(crate) fn generic_with_marker(self, marker: &ClassRef, arity: usize) -> Self {
        let params = vec![marker.clone(); arity];
        self.method(HostMethod::new_static(GENERIC_INFO_METHOD, params))
    }

    /// Declare per-position variance (`O` covariant, `I` contravariant, anything else invariant)
    pub fn variance(self, variance: &str) -> Self {
        self.field(HostField::constant(GENERIC_VARIANCE_FIELD, variance))
    }

    /// Attach a per-instantiation static-data constructor
    ///
    /// Emits a nested `<Name>$$static` class whose only constructor takes the
    /// host `Type[]` class, with `ctor` as its body.
    pub fn static_data<F>(self, env: &HostEnvironment, ctor: F) -> Self
    where
        F: Fn(&StaticInit<'_>) -> RuntimeResult<Option<StaticData>> + Send + Sync + 'static,
    {
        let data_class = ClassBuilder::class(format!("{}{}", self.name, STATIC_DATA_SUFFIX))
            .constructor(HostConstructor {
                params: vec![env.type_array_class().clone()],
                body: Arc::new(ctor),
            })
            .build();
        self.nested(data_class)
    }

    /// Finish the class
    pub fn build(self) -> ClassRef {
        Arc::new(HostClass {
            name: self.name,
            kind: self.kind,
            super_class: self.super_class,
            interfaces: self.interfaces,
            element: self.element,
            methods: self.methods,
            fields: self.fields,
            nested: self.nested,
            constructors: self.constructors,
        })
    }
}
