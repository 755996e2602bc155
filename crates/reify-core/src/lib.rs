//! Reify Core Runtime
//!
//! This crate emulates a reified-generics object model on top of a host
//! runtime whose classes are single-inheritance and whose generics are erased:
//! - Type identity cache (one canonical descriptor per type)
//! - Generic instantiation with per-instantiation static data
//! - Interface assignability under declared variance
//! - Collection-interface proxies for arrays and strings
//! - Uniform element access across primitive, value-type and reference arrays
//!
//! # Example
//!
//! ```rust,ignore
//! use reify_core::{PrimitiveKind, TypeSystem};
//!
//! let system = TypeSystem::with_defaults();
//! let int = system.primitive_type(PrimitiveKind::I32)?;
//! let list = system.type_for_class(&system.environment().collections().generic_list)?;
//! let list_of_int = system.make_generic_type(&list, Some(&[int]))?;
//! assert!(std::sync::Arc::ptr_eq(
//!     &list_of_int,
//!     &system.make_generic_type(&list, Some(&[system.primitive_type(PrimitiveKind::I32)?]))?,
//! ));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]

pub mod boxing;
pub mod error;
pub mod host;
pub mod object;
pub mod options;
pub mod proxy;
pub mod runtime;
pub mod types;

pub use error::{ErrorKind, RuntimeError, RuntimeResult};
pub use host::{
    ClassBuilder, ClassKind, ClassRef, HostClass, HostEnvironment, PrimitiveKind, TypeSig,
};
pub use object::{
    ArrayStorage, BoxedValue, ElementRef, HostArray, HostString, Instance, Monitor, ObjectRef,
    Primitive, StructValue, Value,
};
pub use options::RuntimeOptions;
pub use proxy::{ArrayProxy, ArrayProxyFactory, ProxyRequest};
pub use runtime::{CacheStats, TypeSystem};
pub use types::{
    GenericInfo, StaticData, StaticInit, TypeDescriptor, TypeId, TypeKey, TypeKind, TypeRef,
    TypeShape, Variance, VarianceChecker,
};
