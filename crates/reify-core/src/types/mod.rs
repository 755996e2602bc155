//! Runtime type system
//!
//! Canonical type descriptors, the identity cache that owns them, generic
//! instantiation with per-instantiation static data, supertype resolution
//! and variance-aware assignability.

pub mod cache;
pub mod descriptor;
pub mod instantiate;
pub mod key;
pub mod resolve;
pub mod shape;
pub mod variance;

pub use cache::TypeIdentityCache;
pub use descriptor::{GenericInfo, StaticData, TypeDescriptor, TypeId, TypeKind, TypeRef, TypeShape};
pub use instantiate::StaticInit;
pub use key::TypeKey;
pub use shape::{classify, ClassShape, GenericSignature, Variance};
pub use variance::{CheckMode, VarianceChecker};
