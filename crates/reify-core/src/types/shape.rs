//! Class-shape parser
//!
//! Reads the translator's conventions off a host class and reduces them to a
//! tagged result, so the rest of the crate never pattern-matches on raw
//! reflection data.

use std::sync::Arc;

use crate::host::{
    same_class, ClassRef, HostClass, HostEnvironment, StaticDataCtor, GENERIC_INFO_METHOD,
    GENERIC_VARIANCE_FIELD, STATIC_DATA_SUFFIX,
};

/// Variance of one type-parameter position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    /// Only identical arguments are compatible
    Invariant,
    /// `out`: preserves assignability
    Covariant,
    /// `in`: reverses assignability
    Contravariant,
}

impl Variance {
    /// Decode one variance-string character
    pub fn from_marker(marker: char) -> Self {
        match marker {
            'O' => Variance::Covariant,
            'I' => Variance::Contravariant,
            _ => Variance::Invariant,
        }
    }

    /// Variance at `position` of a variance string
    ///
    /// `None` when no string was declared at all. Positions past the end of a
    /// declared string are invariant.
    pub fn at(variance: Option<&str>, position: usize) -> Option<Self> {
        let variance = variance?;
        Some(
            variance
                .chars()
                .nth(position)
                .map(Variance::from_marker)
                .unwrap_or(Variance::Invariant),
        )
    }
}

/// What the conventions say about a generic definition
#[derive(Clone)]
pub struct GenericSignature {
    /// Number of type parameters
    pub arity: usize,
    /// Declared variance string
    pub variance: Option<Arc<str>>,
    /// Per-instantiation static-data constructor
    pub static_ctor: Option<StaticDataCtor>,
}

impl std::fmt::Debug for GenericSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericSignature")
            .field("arity", &self.arity)
            .field("variance", &self.variance)
            .field("static_ctor", &self.static_ctor.is_some())
            .finish()
    }
}

/// Result of parsing a host class
#[derive(Debug, Clone)]
pub enum ClassShape {
    /// No generic-info marker
    NotGeneric,
    /// Generic definition
    Definition(GenericSignature),
}

/// Parse the generic conventions of `class`
pub fn classify(class: &HostClass, env: &HostEnvironment) -> ClassShape {
    let marker = env.generic_marker();
    let arity = class
        .methods()
        .iter()
        .find(|m| {
            m.is_static
                && m.name == GENERIC_INFO_METHOD
                && !m.params.is_empty()
                && m.params.iter().all(|p| same_class(p, marker))
        })
        .map(|m| m.params.len());

    let Some(arity) = arity else {
        return ClassShape::NotGeneric;
    };

    let variance = class
        .fields()
        .iter()
        .find(|f| f.is_static && f.name == GENERIC_VARIANCE_FIELD)
        .and_then(|f| f.constant.clone());

    ClassShape::Definition(GenericSignature {
        arity,
        variance,
        static_ctor: static_data_ctor(class, env.type_array_class()),
    })
}

fn static_data_ctor(class: &HostClass, type_array: &ClassRef) -> Option<StaticDataCtor> {
    class
        .nested_classes()
        .iter()
        .filter(|n| n.name().ends_with(STATIC_DATA_SUFFIX))
        .flat_map(|n| n.constructors().iter())
        .find(|c| c.params.len() == 1 && same_class(&c.params[0], type_array))
        .map(|c| c.body.clone())
}
