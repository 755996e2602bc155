//! Assignability under declared variance
//!
//! [`VarianceChecker`] answers "can a value of type B be used where A is
//! expected" for the emulated object model. It never fails: anything it
//! cannot resolve counts as not assignable.

use std::sync::Arc;
use tracing::warn;

use super::descriptor::{TypeKind, TypeRef};
use super::shape::Variance;
use crate::runtime::TypeSystem;

/// How positions without a declared variance string are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Only declared variance counts
    Declared,
    /// The source is an array; undeclared positions default to covariant
    ArrayImplied,
}

/// Assignability checker bound to a type system
#[derive(Clone, Copy)]
pub struct VarianceChecker<'a> {
    system: &'a TypeSystem,
}

impl<'a> VarianceChecker<'a> {
    /// Create a checker over `system`
    pub fn new(system: &'a TypeSystem) -> Self {
        Self { system }
    }

    /// Check if `target` is assignable from `source`
    pub fn is_assignable(&self, target: &TypeRef, source: &TypeRef) -> bool {
        if Arc::ptr_eq(target, source) {
            return true;
        }
        if identity_only(target) || identity_only(source) {
            return false;
        }
        if self.is_object(target) {
            return true;
        }

        if let (Some(te), Some(se)) = (array_element(target), array_element(source)) {
            return !te.is_value_type() && !se.is_value_type() && self.is_assignable(te, se);
        }

        if self.derives_from(target, source) {
            return true;
        }
        if !target.is_interface() {
            return false;
        }

        let mode = if source.is_array() {
            CheckMode::ArrayImplied
        } else {
            CheckMode::Declared
        };
        if self.variant_match(target, source, mode) {
            return true;
        }
        match self.system.interfaces(source) {
            Ok(interfaces) => interfaces
                .iter()
                .any(|iface| Arc::ptr_eq(iface, target) || self.variant_match(target, iface, mode)),
            Err(error) => {
                warn!(source = %source.name(), %error, "interface resolution failed during assignability check");
                false
            }
        }
    }

    /// Check two instantiations of the same generic interface
    ///
    /// Returns `false` for different definitions, different arity or any
    /// violated position.
    pub fn is_interface_assignable(&self, target: &TypeRef, source: &TypeRef) -> bool {
        Arc::ptr_eq(target, source) || self.variant_match(target, source, CheckMode::Declared)
    }

    /// Per-argument variance rule between two instantiations
    pub fn variant_match(&self, target: &TypeRef, source: &TypeRef, mode: CheckMode) -> bool {
        if target.kind() != TypeKind::Instantiation || source.kind() != TypeKind::Instantiation {
            return false;
        }
        let (Some(target_def), Some(source_def)) =
            (target.generic_type_definition(), source.generic_type_definition())
        else {
            return false;
        };
        if !Arc::ptr_eq(&target_def, &source_def) || !target_def.is_interface() {
            return false;
        }

        let target_args = target.generic_arguments();
        let source_args = source.generic_arguments();
        if target_args.len() != source_args.len() {
            return false;
        }

        target_args
            .iter()
            .zip(source_args)
            .enumerate()
            .all(|(i, (t, s))| self.position_holds(target_def.variance_of(i), t, s, mode))
    }

    fn position_holds(
        &self,
        declared: Option<Variance>,
        target_arg: &TypeRef,
        source_arg: &TypeRef,
        mode: CheckMode,
    ) -> bool {
        if Arc::ptr_eq(target_arg, source_arg) {
            return true;
        }
        if target_arg.is_value_type() || source_arg.is_value_type() {
            return false;
        }
        let variance = match declared {
            Some(variance) => variance,
            None if mode == CheckMode::ArrayImplied && self.system.options().array_covariance => {
                Variance::Covariant
            }
            None => Variance::Invariant,
        };
        match variance {
            Variance::Covariant => self.is_assignable(target_arg, source_arg),
            Variance::Contravariant => self.is_assignable(source_arg, target_arg),
            Variance::Invariant => false,
        }
    }

    fn derives_from(&self, target: &TypeRef, source: &TypeRef) -> bool {
        let mut current = source.clone();
        loop {
            match self.system.base_type(&current) {
                Ok(Some(base)) => {
                    if Arc::ptr_eq(&base, target) {
                        return true;
                    }
                    current = base;
                }
                Ok(None) => return false,
                Err(error) => {
                    warn!(ty = %current.name(), %error, "base type resolution failed during assignability check");
                    return false;
                }
            }
        }
    }

    fn is_object(&self, ty: &TypeRef) -> bool {
        ty.class()
            .map(|c| crate::host::same_class(c, self.system.environment().object_class()))
            .unwrap_or(false)
    }
}

fn identity_only(ty: &TypeRef) -> bool {
    ty.is_by_ref() || ty.is_void() || ty.is_generic_parameter()
}

fn array_element(ty: &TypeRef) -> Option<&TypeRef> {
    if ty.is_array() {
        ty.element_type()
    } else {
        None
    }
}
