//! Host object model
//!
//! The erased, single-inheritance class model the type system is layered on.
//! Classes are produced by the translator (here: [`ClassBuilder`]) and only
//! ever inspected by reference.

pub mod class;
pub mod environment;

pub use class::{
    same_class, ClassBuilder, ClassKind, ClassRef, HostClass, HostConstructor, HostField,
    HostMethod, PrimitiveKind, StaticDataCtor, TypeSig, GENERIC_INFO_METHOD,
    GENERIC_VARIANCE_FIELD, STATIC_DATA_SUFFIX,
};
pub use environment::{CollectionInterfaces, HostEnvironment};
